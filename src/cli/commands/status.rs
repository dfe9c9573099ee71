//! Status command implementation.

use crate::error::Result;
use crate::model::EntityKind;
use crate::storage::{ChangeEvent, SyncRun};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::open_existing;

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    kinds: Vec<KindStatus>,
    recent_changes: Vec<ChangeEvent>,
}

#[derive(Serialize)]
struct KindStatus {
    kind: EntityKind,
    count: usize,
    last_sync: Option<SyncRun>,
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts)
        .map_or_else(|| ts.to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

/// Execute status command.
///
/// # Errors
///
/// Returns an error if the database is missing or a query fails.
pub fn execute(db_path: Option<&PathBuf>, changes: u32, json: bool) -> Result<()> {
    let storage = open_existing(db_path)?;

    let kinds = EntityKind::ALL
        .into_iter()
        .map(|kind| {
            Ok(KindStatus {
                kind,
                count: storage.count(kind)?,
                last_sync: storage.last_sync_run(kind)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let recent_changes = storage.recent_changes(None, Some(changes))?;

    if json {
        let output = StatusOutput {
            kinds,
            recent_changes,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "Catalogue".cyan().bold());
    for status in &kinds {
        println!("  {:<9} {} stored", status.kind.as_str(), status.count);
        match &status.last_sync {
            Some(run) => {
                let trigger = if run.manual { "manual" } else { "periodic" };
                println!(
                    "            last sync {} ({}, {}): +{} ~{} -{}",
                    format_timestamp(run.finished_at),
                    run.status,
                    trigger,
                    run.inserts,
                    run.updates,
                    run.deletes
                );
                if let Some(error) = &run.error {
                    println!("            {}", error.yellow());
                }
            }
            None => println!("            never synced"),
        }
    }

    if !recent_changes.is_empty() {
        println!();
        println!("{}", "Recent changes".cyan().bold());
        for change in &recent_changes {
            println!(
                "  {}  {:<8} {:<9} {}",
                format_timestamp(change.created_at),
                change.change_type.as_str(),
                change.entity_kind,
                change.entity_id
            );
        }
    }

    Ok(())
}
