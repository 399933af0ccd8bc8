use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{IncidentStatus, Priority};

/// The audited subject: an incident ticket.
///
/// Reference fields (`assigned_to`, `responders`, `team`) hold bare ids.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Incident {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: IncidentStatus,
    pub priority: Priority,
    pub assigned_to: Option<String>,
    pub responders: Vec<String>,
    pub team: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    /// The incident as a JSON object keyed by tracked field names.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_state(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    #[must_use]
    pub fn snapshot(&self) -> IncidentSnapshot {
        IncidentSnapshot {
            title: self.title.clone(),
            status: self.status,
            priority: self.priority,
            assigned_to: self.assigned_to.clone(),
            created_by: self.created_by.clone(),
            created_at: self.created_at,
        }
    }
}

/// Salient attributes of an incident captured when it is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct IncidentSnapshot {
    pub title: String,
    pub status: IncidentStatus,
    pub priority: Priority,
    pub assigned_to: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}
