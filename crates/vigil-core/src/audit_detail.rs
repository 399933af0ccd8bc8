//! Typed audit detail payloads.
//!
//! Each audit action carries exactly one detail shape. The enum is internally
//! tagged with `kind`, whose value is the action literal, so a stored detail
//! always names its own action.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::equivalent;
use crate::entities::IncidentSnapshot;
use crate::enums::{AuditAction, IncidentStatus, Priority, TrackedField};
use crate::errors::CoreError;

/// Resolved identity of an assignee at classification time.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AssigneeContact {
    pub id: String,
    pub display_name: String,
    pub contact: String,
}

/// Action-shaped detail of an audit entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditDetail {
    CreatedIncident {
        title: String,
        status: IncidentStatus,
        priority: Priority,
    },
    UpdatedField {
        field: TrackedField,
        old_value: Value,
        new_value: Value,
    },
    AssignedIncident {
        /// `None` when the incident was unassigned.
        assignee: Option<AssigneeContact>,
        previous_assignee: Option<String>,
        subject_title: String,
    },
    #[serde(alias = "archived_incident")]
    ClosedIncident {
        old_status: Value,
        new_status: Value,
    },
    AddedComment {
        comment_id: String,
        text: String,
    },
    EditedComment {
        comment_id: String,
        old_text: String,
        new_text: String,
    },
    DeletedComment {
        comment_id: String,
        text: String,
    },
    ToggledReaction {
        comment_id: String,
        emoji: String,
        added: bool,
    },
    UploadedAttachment {
        attachment_id: String,
        file_name: String,
        content_type: String,
        size_bytes: u64,
    },
    DeletedAttachment {
        attachment_id: String,
        file_name: String,
    },
    DeletedIncident {
        snapshot: IncidentSnapshot,
    },
}

impl AuditDetail {
    /// The action this detail belongs to.
    #[must_use]
    pub const fn action(&self) -> AuditAction {
        match self {
            Self::CreatedIncident { .. } => AuditAction::CreatedIncident,
            Self::UpdatedField { .. } => AuditAction::UpdatedField,
            Self::AssignedIncident { .. } => AuditAction::AssignedIncident,
            Self::ClosedIncident { .. } => AuditAction::ClosedIncident,
            Self::AddedComment { .. } => AuditAction::AddedComment,
            Self::EditedComment { .. } => AuditAction::EditedComment,
            Self::DeletedComment { .. } => AuditAction::DeletedComment,
            Self::ToggledReaction { .. } => AuditAction::ToggledReaction,
            Self::UploadedAttachment { .. } => AuditAction::UploadedAttachment,
            Self::DeletedAttachment { .. } => AuditAction::DeletedAttachment,
            Self::DeletedIncident { .. } => AuditAction::DeletedIncident,
        }
    }

    /// The tracked field this detail describes, if it is a field change.
    #[must_use]
    pub const fn field(&self) -> Option<TrackedField> {
        match self {
            Self::UpdatedField { field, .. } => Some(*field),
            Self::AssignedIncident { .. } => Some(TrackedField::AssignedTo),
            Self::ClosedIncident { .. } => Some(TrackedField::Status),
            _ => None,
        }
    }

    /// Reject details whose shape contradicts their action.
    ///
    /// Assignment changes must use `AssignedIncident`, a field update must
    /// actually change the value, and ids must be present.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` describing the mismatch.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::UpdatedField { field, old_value, new_value } => {
                if *field == TrackedField::AssignedTo {
                    return Err(CoreError::Validation(
                        "assigned_to changes must be recorded as assigned_incident".into(),
                    ));
                }
                if equivalent(Some(old_value), Some(new_value)) {
                    return Err(CoreError::Validation(format!(
                        "updated_field for '{field}' does not change the value"
                    )));
                }
                Ok(())
            }
            Self::AssignedIncident { subject_title, .. } if subject_title.is_empty() => Err(
                CoreError::Validation("assigned_incident requires a subject title".into()),
            ),
            Self::AddedComment { comment_id, .. }
            | Self::EditedComment { comment_id, .. }
            | Self::DeletedComment { comment_id, .. }
            | Self::ToggledReaction { comment_id, .. }
                if comment_id.is_empty() =>
            {
                Err(CoreError::Validation(format!(
                    "{} requires a comment id",
                    self.action()
                )))
            }
            Self::UploadedAttachment { attachment_id, .. }
            | Self::DeletedAttachment { attachment_id, .. }
                if attachment_id.is_empty() =>
            {
                Err(CoreError::Validation(format!(
                    "{} requires an attachment id",
                    self.action()
                )))
            }
            _ => Ok(()),
        }
    }
}
