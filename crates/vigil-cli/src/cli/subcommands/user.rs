use clap::Subcommand;

/// User commands.
#[derive(Clone, Debug, Subcommand)]
pub enum UserCommands {
    /// Register a user.
    Add {
        #[arg(long)]
        name: String,
        /// Contact address, normally an email.
        #[arg(long)]
        contact: String,
    },
    /// Change a user's display name.
    Rename {
        id: String,
        #[arg(long)]
        name: String,
    },
    /// Show a user by ID.
    Show { id: String },
    /// List users.
    List,
}
