//! Entity structs for all Vigil domain objects.
//!
//! Each entity maps to a table in the libSQL database (see `vigil-db`
//! migrations). All structs derive `Serialize`, `Deserialize`, and `JsonSchema`
//! for JSON roundtrip and schema validation.

mod attachment;
mod audit;
mod comment;
mod incident;
mod user;

pub use attachment::Attachment;
pub use audit::{AuditEntry, AuditRecord, PrincipalRef, SubjectRef};
pub use comment::Comment;
pub use incident::{Incident, IncidentSnapshot};
pub use user::UserProfile;
