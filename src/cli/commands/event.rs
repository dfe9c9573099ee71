//! Event browsing commands.
//!
//! - `eeese events list [--upcoming]` - List stored events by start time
//! - `eeese events show <id>` - Show event details

use crate::cli::EventCommands;
use crate::error::{Error, Result};
use crate::model::Event;
use crate::storage::SqliteStorage;
use crate::validate::find_similar_ids;
use chrono::{DateTime, FixedOffset};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::open_existing;

#[derive(Serialize)]
struct EventListOutput {
    events: Vec<Event>,
    count: usize,
}

fn format_time(time: Option<DateTime<FixedOffset>>) -> String {
    time.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M %:z").to_string())
}

/// Execute an event command.
///
/// # Errors
///
/// Returns an error if the database is missing or the event does not exist.
pub fn execute(command: &EventCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_existing(db_path)?;

    match command {
        EventCommands::List { upcoming } => execute_list(&storage, *upcoming, json),
        EventCommands::Show { id } => execute_show(&storage, id, json),
    }
}

fn execute_list(storage: &SqliteStorage, upcoming: bool, json: bool) -> Result<()> {
    let now = chrono::Utc::now().fixed_offset();
    let events = storage.list_events(upcoming.then_some(now))?;

    if json {
        let output = EventListOutput {
            count: events.len(),
            events,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if events.is_empty() {
        if upcoming {
            println!("No upcoming events.");
        } else {
            println!("No events stored.");
            println!("\nFetch the catalogue with: eeese sync");
        }
    } else {
        println!("Events ({}):\n", events.len());
        for event in &events {
            let name = if event.is_upcoming(now) {
                event.name.bold()
            } else {
                event.name.dimmed()
            };
            println!("  {name}");
            println!("    ID:    {}", event.id);
            println!("    Start: {}", format_time(event.starts_at));
            println!();
        }
    }

    Ok(())
}

fn execute_show(storage: &SqliteStorage, id: &str, json: bool) -> Result<()> {
    let event = match storage.get_event(id)? {
        Some(event) => event,
        None => {
            let ids: Vec<String> = storage.list_events(None)?.into_iter().map(|e| e.id).collect();
            return Err(Error::EventNotFound {
                id: id.to_string(),
                similar: find_similar_ids(id, &ids, 3),
            });
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&event)?);
    } else {
        println!("Event: {}", event.name.bold());
        println!("  ID:          {}", event.id);
        println!("  Starts:      {}", format_time(event.starts_at));
        println!("  Ends:        {}", format_time(event.ends_at));
        println!(
            "  Location:    {}",
            event
                .location
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string)
        );
        println!("  Image:       {}", event.image_uri.as_deref().unwrap_or("-"));
        println!("  Description: {}", event.description.as_deref().unwrap_or("-"));
    }

    Ok(())
}
