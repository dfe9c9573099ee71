//! Sync command implementation.
//!
//! `eeese sync` runs one manual pass against the backend, prints the
//! per-kind outcome and records it in the sync log.

use crate::cli::SyncArgs;
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::sync::{HttpRemote, PassStatus, SharedStorage, SyncEngine, SyncOutcome, SyncRequest};
use colored::Colorize;
use std::path::PathBuf;

use super::open_or_create;

/// Engine wired to the HTTP backend and the shared SQLite store.
pub(crate) type CliEngine = SyncEngine<HttpRemote, SharedStorage>;

/// Build an engine from resolved configuration.
pub(crate) fn build_engine(config: &SyncConfig, store: SharedStorage) -> Result<CliEngine> {
    let remote = HttpRemote::new(&config.backend_url, config.timeout)?;
    Ok(SyncEngine::new(remote, store).with_cross_kind_atomicity(config.cross_kind_atomic))
}

/// Run one pass and record a sync log row per kind.
pub(crate) async fn run_pass(engine: &CliEngine, request: SyncRequest) -> Result<SyncOutcome> {
    let outcome = engine.run_sync(request).await?;

    let finished_at = chrono::Utc::now().timestamp_millis();
    engine.store().with_storage(|storage| {
        for kind in &outcome.kinds {
            storage.record_sync_run(&kind.to_run(outcome.trigger.manual, finished_at))?;
        }
        Ok(())
    })?;

    Ok(outcome)
}

/// Print an outcome, as one JSON document or a per-kind table.
pub(crate) fn print_outcome(outcome: &SyncOutcome, json: bool, pretty: bool) -> Result<()> {
    if json {
        let payload = if pretty {
            serde_json::to_string_pretty(outcome)?
        } else {
            serde_json::to_string(outcome)?
        };
        println!("{payload}");
        return Ok(());
    }

    for kind in &outcome.kinds {
        let padded = format!("{:<13}", kind.status.as_str());
        let status = match kind.status {
            PassStatus::Synced => padded.green(),
            PassStatus::UpToDate => padded.normal(),
            PassStatus::RetryLater | PassStatus::Stale => padded.yellow(),
            PassStatus::ApplyFailed => padded.red(),
        };
        print!(
            "  {:<9} {status} +{} ~{} -{}",
            kind.kind.as_str(),
            kind.stats.inserts,
            kind.stats.updates,
            kind.stats.deletes
        );
        if let Some(error) = &kind.error {
            print!("  ({})", error.dimmed());
        }
        println!();
    }

    println!("Total: {} changes applied", outcome.entries_total);
    if outcome.full_resync_requested {
        println!("{}", "A request timed out; the next pass will retry.".yellow());
    }
    if outcome.storage_error_occurred {
        println!("{}", "Some local data may be stale.".yellow());
    }
    Ok(())
}

/// Summary error for a pass in which some kind did not converge.
pub(crate) fn failure_summary(outcome: &SyncOutcome) -> Option<Error> {
    let failed: Vec<String> = outcome
        .kinds
        .iter()
        .filter(|k| !k.status.is_success())
        .map(|k| format!("{} {}", k.kind, k.status))
        .collect();

    if failed.is_empty() {
        None
    } else {
        Some(Error::Sync(failed.join(", ")))
    }
}

/// Execute the sync command.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the local store cannot be
/// read, or any kind failed to sync (after printing the outcome).
pub fn execute(args: &SyncArgs, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let config = SyncConfig::resolve(
        args.backend.backend_url.as_deref(),
        args.backend.timeout,
        !args.backend.per_kind,
    )?;
    let store = SharedStorage::new(open_or_create(db_path)?);
    let engine = build_engine(&config, store)?;

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(run_pass(&engine, SyncRequest::manual()))?;

    if !json {
        println!("Synced with {}", config.backend_url);
    }
    print_outcome(&outcome, json, true)?;

    match failure_summary(&outcome) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityKind;
    use crate::sync::{FetchError, KindOutcome, SyncStats};

    #[test]
    fn test_failure_summary() {
        let ok = SyncOutcome::from_kinds(
            SyncRequest::manual(),
            vec![KindOutcome::planned(EntityKind::Projects, SyncStats::default())],
        );
        assert!(failure_summary(&ok).is_none());

        let failed = SyncOutcome::from_kinds(
            SyncRequest::manual(),
            vec![KindOutcome::fetch_failed(
                EntityKind::Events,
                &FetchError::Io("refused".into()),
            )],
        );
        let err = failure_summary(&failed).unwrap();
        assert_eq!(err.to_string(), "Sync error: events stale");
        assert_eq!(err.exit_code(), 6);
    }
}
