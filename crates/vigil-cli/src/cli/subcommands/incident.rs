use clap::{Args, Subcommand};

/// Incident commands.
#[derive(Clone, Debug, Subcommand)]
pub enum IncidentCommands {
    /// Open an incident.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "P3")]
        priority: String,
        #[arg(long)]
        assign: Option<String>,
        /// Comma-separated user IDs.
        #[arg(long, value_delimiter = ',')]
        responders: Vec<String>,
        #[arg(long)]
        team: Option<String>,
    },
    /// Update tracked fields. Unchanged values record nothing.
    Update(IncidentUpdateArgs),
    /// Show an incident by ID.
    Show { id: String },
    /// List incidents.
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// Delete an incident. Its audit history stays.
    Delete { id: String },
}

/// Arguments for `vigil incident update`.
#[derive(Clone, Debug, Args)]
pub struct IncidentUpdateArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,
    #[arg(long)]
    pub clear_description: bool,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long, conflicts_with = "unassign")]
    pub assign: Option<String>,
    #[arg(long)]
    pub unassign: bool,
    /// Comma-separated user IDs; the bare flag clears the list.
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    pub responders: Option<Vec<String>>,
    #[arg(long, conflicts_with = "clear_team")]
    pub team: Option<String>,
    #[arg(long)]
    pub clear_team: bool,
    /// Raw JSON update payload instead of the field flags.
    #[arg(long, conflicts_with_all = [
        "title", "description", "clear_description", "status", "priority",
        "assign", "unassign", "responders", "team", "clear_team",
    ])]
    pub json: Option<String>,
}
