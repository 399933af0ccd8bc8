//! Closed enums for audit actions, subjects, incident state and tracked fields.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`
//! (priorities keep their upper-case `P1`..`P5` labels). The `as_str` form is
//! what lands in SQL columns and exports.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// AuditAction
// ---------------------------------------------------------------------------

/// Semantic tag of an audit entry.
///
/// The set is closed: callers never choose free text. `ClosedIncident` also
/// reads back the legacy `archived_incident` literal written by older
/// deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    CreatedIncident,
    UpdatedField,
    AssignedIncident,
    #[serde(alias = "archived_incident")]
    ClosedIncident,
    AddedComment,
    EditedComment,
    DeletedComment,
    ToggledReaction,
    UploadedAttachment,
    DeletedAttachment,
    DeletedIncident,
}

impl AuditAction {
    pub const ALL: &'static [Self] = &[
        Self::CreatedIncident,
        Self::UpdatedField,
        Self::AssignedIncident,
        Self::ClosedIncident,
        Self::AddedComment,
        Self::EditedComment,
        Self::DeletedComment,
        Self::ToggledReaction,
        Self::UploadedAttachment,
        Self::DeletedAttachment,
        Self::DeletedIncident,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedIncident => "created_incident",
            Self::UpdatedField => "updated_field",
            Self::AssignedIncident => "assigned_incident",
            Self::ClosedIncident => "closed_incident",
            Self::AddedComment => "added_comment",
            Self::EditedComment => "edited_comment",
            Self::DeletedComment => "deleted_comment",
            Self::ToggledReaction => "toggled_reaction",
            Self::UploadedAttachment => "uploaded_attachment",
            Self::DeletedAttachment => "deleted_attachment",
            Self::DeletedIncident => "deleted_incident",
        }
    }

    /// Every literal that may be stored in the `action` column for this action.
    ///
    /// Filtering by an action must match all of them.
    #[must_use]
    pub const fn stored_literals(self) -> &'static [&'static str] {
        match self {
            Self::ClosedIncident => &["closed_incident", "archived_incident"],
            Self::CreatedIncident => &["created_incident"],
            Self::UpdatedField => &["updated_field"],
            Self::AssignedIncident => &["assigned_incident"],
            Self::AddedComment => &["added_comment"],
            Self::EditedComment => &["edited_comment"],
            Self::DeletedComment => &["deleted_comment"],
            Self::ToggledReaction => &["toggled_reaction"],
            Self::UploadedAttachment => &["uploaded_attachment"],
            Self::DeletedAttachment => &["deleted_attachment"],
            Self::DeletedIncident => &["deleted_incident"],
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|action| action.stored_literals().contains(&s))
            .ok_or_else(|| CoreError::Validation(format!("unknown audit action '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// SubjectType
// ---------------------------------------------------------------------------

/// Kind of entity an audit entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    Incident,
}

impl SubjectType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Incident => "incident",
        }
    }
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// IncidentStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of an incident.
///
/// ```text
/// open → acknowledged → investigating → resolved → closed
/// ```
///
/// `archived` is the legacy spelling of `closed` and is still accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    Acknowledged,
    Investigating,
    Resolved,
    Closed,
    Archived,
}

impl IncidentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Acknowledged => "acknowledged",
            Self::Investigating => "investigating",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Incident priority, `P1` being the most urgent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum Priority {
    P1,
    P2,
    P3,
    P4,
    P5,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
            Self::P4 => "P4",
            Self::P5 => "P5",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TrackedField
// ---------------------------------------------------------------------------

/// Incident fields whose changes are recorded in the audit trail.
///
/// Declaration order is the order in which detected changes are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrackedField {
    Title,
    Description,
    Status,
    Priority,
    AssignedTo,
    Responders,
    Team,
}

impl TrackedField {
    /// The incident allow-list, in reporting order.
    pub const INCIDENT: &'static [Self] = &[
        Self::Title,
        Self::Description,
        Self::Status,
        Self::Priority,
        Self::AssignedTo,
        Self::Responders,
        Self::Team,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::AssignedTo => "assigned_to",
            Self::Responders => "responders",
            Self::Team => "team",
        }
    }

    /// Look up a tracked field by its payload key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::INCIDENT.iter().copied().find(|f| f.as_str() == key)
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
