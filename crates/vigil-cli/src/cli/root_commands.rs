use clap::Subcommand;

use crate::cli::subcommands::{
    AttachmentCommands, AuditCommands, CommentCommands, IncidentCommands, UserCommands,
};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Users (performers and assignees).
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
    /// Incidents.
    Incident {
        #[command(subcommand)]
        action: IncidentCommands,
    },
    /// Comments and reactions on incidents.
    Comment {
        #[command(subcommand)]
        action: CommentCommands,
    },
    /// Attachment metadata on incidents.
    Attachment {
        #[command(subcommand)]
        action: AttachmentCommands,
    },
    /// Read and export the audit trail.
    Audit {
        #[command(subcommand)]
        action: AuditCommands,
    },
}
