mod attachment;
mod audit;
mod comment;
mod incident;
mod user;

pub use attachment::AttachmentCommands;
pub use audit::{AuditCommands, AuditExportArgs, AuditFilterArgs, AuditQueryArgs};
pub use comment::CommentCommands;
pub use incident::{IncidentCommands, IncidentUpdateArgs};
pub use user::UserCommands;
