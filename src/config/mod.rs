//! Configuration management.
//!
//! Every setting resolves in the same order: explicit CLI flag, then
//! environment variable, then built-in default. The resolved values are
//! bundled into a [`SyncConfig`] and handed to the engine at construction;
//! nothing here is global state.

use crate::error::{Error, Result};

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Database path override.
pub const DB_ENV: &str = "EEESE_DB";
/// Backend base URL override.
pub const BACKEND_URL_ENV: &str = "EEESE_BACKEND_URL";
/// Request timeout override, in seconds.
pub const TIMEOUT_ENV: &str = "EEESE_TIMEOUT_SECS";

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-user data directory for eeese.
///
/// Platform data dir (`~/.local/share` on Linux) joined with `eeese`.
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.data_dir().join("eeese"))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `EEESE_DB` environment variable
/// 3. `<data dir>/eeese/eeese.db`
///
/// # Returns
///
/// Returns the path to the database file, or `None` if no location found.
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    resolve_db_path_with(explicit_path, env_var)
}

fn resolve_db_path_with(
    explicit_path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Some(path) = lookup(DB_ENV) {
        return Some(PathBuf::from(path));
    }

    data_dir().map(|dir| dir.join("eeese.db"))
}

/// Resolve the backend base URL.
///
/// # Errors
///
/// Returns `Error::Config` if the URL is not http(s).
pub fn resolve_backend_url(explicit: Option<&str>) -> Result<String> {
    resolve_backend_url_with(explicit, env_var)
}

fn resolve_backend_url_with(
    explicit: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    let url = explicit
        .map(str::to_string)
        .or_else(|| lookup(BACKEND_URL_ENV))
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

    let url = url.trim().trim_end_matches('/').to_string();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "Backend URL must start with http:// or https://, got '{url}'"
        )));
    }
    Ok(url)
}

/// Resolve the per-request timeout.
///
/// # Errors
///
/// Returns `Error::Config` if the environment value is not a positive integer,
/// or `Error::InvalidArgument` for a zero flag value.
pub fn resolve_timeout(explicit_secs: Option<u64>) -> Result<Duration> {
    resolve_timeout_with(explicit_secs, env_var)
}

fn resolve_timeout_with(
    explicit_secs: Option<u64>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Duration> {
    if let Some(secs) = explicit_secs {
        if secs == 0 {
            return Err(Error::InvalidArgument("--timeout must be at least 1 second".to_string()));
        }
        return Ok(Duration::from_secs(secs));
    }

    match lookup(TIMEOUT_ENV) {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(Error::Config(format!(
                "{TIMEOUT_ENV} must be a positive number of seconds, got '{raw}'"
            ))),
        },
        None => Ok(DEFAULT_TIMEOUT),
    }
}

/// When periodic passes run.
///
/// A pass is due every `interval`; it may start anywhere in the last
/// `flex` of that interval without counting as late.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSchedule {
    pub interval: Duration,
    pub flex: Duration,
}

impl SyncSchedule {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);
    pub const DEFAULT_FLEX: Duration = Duration::from_secs(20 * 60);
    /// Longest accepted interval or flex window: one week.
    pub const MAX_MINUTES: u64 = 7 * 24 * 60;

    /// Build a schedule from minute counts, defaulting either side.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` for a zero interval, a value above
    /// [`Self::MAX_MINUTES`], or a flex window longer than the interval.
    pub fn from_minutes(interval_mins: Option<u64>, flex_mins: Option<u64>) -> Result<Self> {
        let interval = interval_mins
            .map_or(Ok(Self::DEFAULT_INTERVAL), |m| minutes("--interval-mins", m))?;
        let flex = flex_mins.map_or(Ok(Self::DEFAULT_FLEX), |m| minutes("--flex-mins", m))?;

        if interval.is_zero() {
            return Err(Error::InvalidArgument("--interval-mins must be at least 1".to_string()));
        }
        if flex > interval {
            return Err(Error::InvalidArgument(format!(
                "--flex-mins ({}) cannot exceed the interval ({})",
                flex.as_secs() / 60,
                interval.as_secs() / 60
            )));
        }
        Ok(Self { interval, flex })
    }

    /// Whether a pass starting `elapsed` after the previous one is late.
    #[must_use]
    pub fn is_late(&self, elapsed: Duration) -> bool {
        self.interval
            .checked_add(self.flex)
            .is_some_and(|deadline| elapsed > deadline)
    }
}

fn minutes(flag: &str, mins: u64) -> Result<Duration> {
    if mins > SyncSchedule::MAX_MINUTES {
        return Err(Error::InvalidArgument(format!(
            "{flag} ({mins}) exceeds the maximum of {} minutes",
            SyncSchedule::MAX_MINUTES
        )));
    }
    Ok(Duration::from_secs(mins * 60))
}

impl Default for SyncSchedule {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            flex: Self::DEFAULT_FLEX,
        }
    }
}

/// Everything a sync run needs besides the store.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub backend_url: String,
    pub timeout: Duration,
    pub schedule: SyncSchedule,
    /// Commit both kinds in one transaction (default).
    pub cross_kind_atomic: bool,
}

impl SyncConfig {
    /// Resolve from CLI flags and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if any setting is invalid.
    pub fn resolve(
        backend_url: Option<&str>,
        timeout_secs: Option<u64>,
        cross_kind_atomic: bool,
    ) -> Result<Self> {
        Ok(Self {
            backend_url: resolve_backend_url(backend_url)?,
            timeout: resolve_timeout(timeout_secs)?,
            schedule: SyncSchedule::default(),
            cross_kind_atomic,
        })
    }

    #[must_use]
    pub fn with_schedule(mut self, schedule: SyncSchedule) -> Self {
        self.schedule = schedule;
        self
    }
}
