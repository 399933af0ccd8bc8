use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand};

/// Audit trail commands.
#[derive(Clone, Debug, Subcommand)]
pub enum AuditCommands {
    /// One page of the filtered trail, most recent first.
    Query(AuditQueryArgs),
    /// The whole filtered trail as CSV.
    Export(AuditExportArgs),
    /// Entries in the trailing window (24h by default).
    Recent {
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// Print only the number of entries in the window.
        #[arg(long)]
        count: bool,
    },
    /// Show one entry by ID.
    Show { id: String },
}

/// Filters shared by `query` and `export`.
#[derive(Clone, Debug, Default, Args)]
pub struct AuditFilterArgs {
    /// User ID of the performer.
    #[arg(long)]
    pub performer: Option<String>,
    /// Action tag, e.g. `closed_incident` or `updated-field`.
    #[arg(long)]
    pub action: Option<String>,
    #[arg(long)]
    pub subject_type: Option<String>,
    /// Subject ID, e.g. an incident ID.
    #[arg(long)]
    pub subject: Option<String>,
    /// First day included (UTC, YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Last day included (UTC, YYYY-MM-DD).
    #[arg(long)]
    pub to: Option<NaiveDate>,
    /// Correlation ID of the originating request.
    #[arg(long)]
    pub request: Option<String>,
}

/// Arguments for `vigil audit query`.
#[derive(Clone, Debug, Args)]
pub struct AuditQueryArgs {
    #[command(flatten)]
    pub filter: AuditFilterArgs,
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub page_size: Option<u32>,
}

/// Arguments for `vigil audit export`.
#[derive(Clone, Debug, Args)]
pub struct AuditExportArgs {
    #[command(flatten)]
    pub filter: AuditFilterArgs,
    /// Write to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
