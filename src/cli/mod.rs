//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// eeese - department projects and events catalogue, mirrored locally
#[derive(Parser, Debug)]
#[command(name = "eeese", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: <data dir>/eeese/eeese.db)
    #[arg(long, global = true, env = "EEESE_DB")]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print version information
    Version,

    /// Fetch the catalogue from the backend once
    Sync(SyncArgs),

    /// Sync periodically until interrupted
    Watch(WatchArgs),

    /// Browse projects
    Projects {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Browse events
    Events {
        #[command(subcommand)]
        command: EventCommands,
    },

    /// Show stored counts, last sync results and recent changes
    Status {
        /// Number of recent changes to show
        #[arg(long, default_value_t = 10)]
        changes: u32,
    },
}

/// Backend connection flags shared by `sync` and `watch`.
#[derive(Args, Debug, Clone, Default)]
pub struct BackendArgs {
    /// Backend base URL (default: http://localhost:8000/api)
    #[arg(long, env = "EEESE_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Per-request timeout in seconds (default: 30)
    #[arg(long, env = "EEESE_TIMEOUT_SECS")]
    pub timeout: Option<u64>,

    /// Commit projects and events separately, so one kind's failure
    /// does not roll back the other
    #[arg(long)]
    pub per_kind: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    #[command(flatten)]
    pub backend: BackendArgs,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub backend: BackendArgs,

    /// Minutes between passes (default: 360)
    #[arg(long)]
    pub interval_mins: Option<u64>,

    /// Minutes a pass may run late before a warning (default: 20)
    #[arg(long)]
    pub flex_mins: Option<u64>,

    /// Skip the immediate first pass
    #[arg(long)]
    pub no_initial: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProjectCommands {
    /// List projects
    List {
        /// Only this category (software, power, telecom, electronics-control)
        #[arg(long, short)]
        category: Option<String>,
    },

    /// Show one project
    Show {
        /// Project ID
        id: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum EventCommands {
    /// List events by start time
    List {
        /// Hide events that have already finished
        #[arg(long)]
        upcoming: bool,
    },

    /// Show one event
    Show {
        /// Event ID
        id: String,
    },
}
