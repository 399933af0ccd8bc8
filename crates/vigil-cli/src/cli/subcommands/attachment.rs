use clap::Subcommand;

/// Attachment commands. Files are stored elsewhere; only metadata is kept.
#[derive(Clone, Debug, Subcommand)]
pub enum AttachmentCommands {
    /// Register an uploaded file.
    Add {
        incident: String,
        #[arg(long)]
        file_name: String,
        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,
        #[arg(long)]
        size: u64,
    },
    /// Delete an attachment.
    Delete { id: String },
    /// List attachments on an incident.
    List { incident: String },
}
