use clap::Subcommand;

/// Comment commands.
#[derive(Clone, Debug, Subcommand)]
pub enum CommentCommands {
    /// Comment on an incident.
    Add {
        incident: String,
        #[arg(long)]
        body: String,
    },
    /// Replace a comment's text.
    Edit {
        id: String,
        #[arg(long)]
        body: String,
    },
    /// Delete a comment.
    Delete { id: String },
    /// Add or remove your reaction on a comment.
    React {
        id: String,
        #[arg(long)]
        emoji: String,
    },
    /// List comments on an incident.
    List { incident: String },
}
