//! Incident update builder.
//!
//! `Option<Option<T>>` fields distinguish "not in the update" (`None`) from
//! "cleared" (`Some(None)`). Reference fields accept either a bare id or an
//! expanded object carrying `id` and/or `_id`, and serialize back exactly as
//! the caller sent them so audit entries show the caller's own values.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use vigil_core::canonical::reference_id_of;
use vigil_core::enums::{IncidentStatus, Priority};

use crate::error::DatabaseError;

/// A user or team reference as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Id(String),
    Expanded(ExpandedReference),
}

/// An expanded reference object, kept verbatim. Keys other than the id are
/// display-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedReference {
    id: String,
    raw: Map<String, Value>,
}

impl Reference {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Expanded(r) => &r.id,
        }
    }
}

impl TryFrom<Value> for Reference {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let id = reference_id_of(&value)
            .ok_or_else(|| format!("expected a user id or an object with `id`/`_id`, got {value}"))?
            .to_string();
        match value {
            Value::Object(raw) => Ok(Self::Expanded(ExpandedReference { id, raw })),
            _ => Ok(Self::Id(id)),
        }
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Self::try_from(Value::deserialize(deserializer)?).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Id(id) => serializer.serialize_str(id),
            Self::Expanded(r) => r.raw.serialize(serializer),
        }
    }
}

impl From<&str> for Reference {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for Reference {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

/// Partial update of an incident. Unknown keys are rejected on deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncidentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IncidentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub assigned_to: Option<Option<Reference>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub responders: Option<Option<Vec<Reference>>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub team: Option<Option<Reference>>,
}

/// Deserialize a present key (including `null`) as `Some`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl IncidentUpdate {
    /// Parse a raw JSON payload from the boundary layer.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` for non-object payloads, untracked
    /// keys, or values of the wrong type.
    pub fn from_json(payload: &Value) -> Result<Self, DatabaseError> {
        if !payload.is_object() {
            return Err(DatabaseError::Validation(
                "update payload must be a JSON object".into(),
            ));
        }
        serde_json::from_value(payload.clone())
            .map_err(|e| DatabaseError::Validation(format!("invalid incident update: {e}")))
    }

    /// The present fields as a JSON object, in caller representation.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Other` if serialization fails.
    pub fn to_payload(&self) -> Result<Map<String, Value>, DatabaseError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(DatabaseError::InvalidState(
                "incident update did not serialize to an object".into(),
            )),
        }
    }

    /// Whether no field is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
            && self.responders.is_none()
            && self.team.is_none()
    }
}

pub struct IncidentUpdateBuilder(IncidentUpdate);

impl IncidentUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(IncidentUpdate::default())
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.0.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.0.description = Some(description);
        self
    }

    #[must_use]
    pub fn status(mut self, status: IncidentStatus) -> Self {
        self.0.status = Some(status);
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.0.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn assigned_to(mut self, assignee: Option<Reference>) -> Self {
        self.0.assigned_to = Some(assignee);
        self
    }

    #[must_use]
    pub fn responders(mut self, responders: Option<Vec<Reference>>) -> Self {
        self.0.responders = Some(responders);
        self
    }

    #[must_use]
    pub fn team(mut self, team: Option<Reference>) -> Self {
        self.0.team = Some(team);
        self
    }

    #[must_use]
    pub fn build(self) -> IncidentUpdate {
        self.0
    }
}

impl Default for IncidentUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
