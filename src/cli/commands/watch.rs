//! Watch command implementation.
//!
//! `eeese watch` runs a periodic pass every schedule interval until Ctrl-C.
//! A failed pass is logged and retried on the next tick; only errors that
//! retrying cannot fix (a corrupt local record, say) stop the loop.

use crate::cli::WatchArgs;
use crate::config::{SyncConfig, SyncSchedule};
use crate::error::Result;
use crate::sync::{SharedStorage, SyncRequest};
use std::path::PathBuf;
use tokio::time::{Instant, MissedTickBehavior};

use super::open_or_create;
use super::sync::{build_engine, print_outcome, run_pass};

/// Execute the watch command.
///
/// # Errors
///
/// Returns an error if configuration is invalid or a pass fails with a
/// non-retryable error.
pub fn execute(args: &WatchArgs, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let schedule = SyncSchedule::from_minutes(args.interval_mins, args.flex_mins)?;
    let config = SyncConfig::resolve(
        args.backend.backend_url.as_deref(),
        args.backend.timeout,
        !args.backend.per_kind,
    )?
    .with_schedule(schedule);

    let store = SharedStorage::new(open_or_create(db_path)?);
    let engine = build_engine(&config, store)?;

    tracing::info!(
        backend = %config.backend_url,
        interval_secs = schedule.interval.as_secs(),
        flex_secs = schedule.flex.as_secs(),
        "Watching backend"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut ticker = tokio::time::interval(schedule.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if args.no_initial {
            // First tick completes immediately
            ticker.tick().await;
        }

        let mut shutdown = std::pin::pin!(tokio::signal::ctrl_c());
        let mut last_pass: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => {
                    tracing::info!("Interrupted, stopping");
                    break;
                }
            }

            let started = Instant::now();
            if let Some(previous) = last_pass {
                let elapsed = started - previous;
                if schedule.is_late(elapsed) {
                    tracing::warn!(
                        elapsed_secs = elapsed.as_secs(),
                        "Pass started later than the schedule allows"
                    );
                }
            }
            last_pass = Some(started);

            match run_pass(&engine, SyncRequest::periodic()).await {
                Ok(outcome) => print_outcome(&outcome, json, false)?,
                Err(err) if err.error_code().is_retryable() => {
                    tracing::warn!(error = %err, "Sync pass failed, retrying next tick");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(())
    })
}
