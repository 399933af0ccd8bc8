use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A user as seen by the identity resolver.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    /// Primary contact, normally an email address.
    pub contact: String,
    pub created_at: DateTime<Utc>,
}
