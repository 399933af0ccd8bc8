//! Action classification.
//!
//! Maps detected field changes and non-field domain events to typed
//! [`AuditDetail`]s. Field rules, first match wins:
//!
//! 1. `status` moving to a closure literal ⇒ `ClosedIncident`
//! 2. `assigned_to` ⇒ `AssignedIncident`, enriched with the resolved assignee
//! 3. any other tracked field ⇒ `UpdatedField`
//!
//! Classification never guesses: a change it cannot map is an error.

use serde_json::Value;

use crate::audit_detail::{AssigneeContact, AuditDetail};
use crate::canonical::reference_id_of;
use crate::changes::FieldChange;
use crate::entities::{Attachment, Comment, Incident, UserProfile};
use crate::enums::TrackedField;
use crate::errors::CoreError;

/// Status literals that mean the incident is closed.
///
/// `archived` is the legacy spelling. New synonyms go here and nowhere else.
pub const CLOSED_STATUS_SYNONYMS: &[&str] = &["closed", "archived"];

/// Whether a status value is one of the closure literals.
#[must_use]
pub fn is_closure_status(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| CLOSED_STATUS_SYNONYMS.contains(&s))
}

/// Facts resolved by the caller before classifying field changes.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    /// Display title of the subject at classification time.
    pub subject_title: &'a str,
    /// The new assignee, resolved through the identity resolver.
    pub assignee: Option<&'a UserProfile>,
}

/// Classify a single field change.
///
/// # Errors
///
/// Returns `CoreError::Validation` if an `assigned_to` value is not a
/// reference, and `CoreError::Classification` if the assignee was not
/// resolved by the caller.
pub fn classify_change(
    change: &FieldChange,
    ctx: &ClassifyContext<'_>,
) -> Result<AuditDetail, CoreError> {
    match change.field {
        TrackedField::Status if is_closure_status(&change.new_value) => {
            Ok(AuditDetail::ClosedIncident {
                old_status: change.old_value.clone(),
                new_status: change.new_value.clone(),
            })
        }
        TrackedField::AssignedTo => classify_assignment(change, ctx),
        field => Ok(AuditDetail::UpdatedField {
            field,
            old_value: change.old_value.clone(),
            new_value: change.new_value.clone(),
        }),
    }
}

/// Classify every change of one mutation, failing on the first error.
///
/// # Errors
///
/// Propagates the first error from [`classify_change`].
pub fn classify_changes(
    changes: &[FieldChange],
    ctx: &ClassifyContext<'_>,
) -> Result<Vec<AuditDetail>, CoreError> {
    changes.iter().map(|c| classify_change(c, ctx)).collect()
}

/// The assignee id a change moves to, `None` for an unassignment.
///
/// # Errors
///
/// Returns `CoreError::Validation` if the value is neither `null` nor a
/// reference.
pub fn assignee_id(change: &FieldChange) -> Result<Option<&str>, CoreError> {
    if change.new_value.is_null() {
        return Ok(None);
    }
    reference_id_of(&change.new_value).map(Some).ok_or_else(|| {
        CoreError::Validation(format!(
            "assigned_to must be a user reference, got {}",
            change.new_value
        ))
    })
}

fn classify_assignment(
    change: &FieldChange,
    ctx: &ClassifyContext<'_>,
) -> Result<AuditDetail, CoreError> {
    let previous_assignee = reference_id_of(&change.old_value).map(String::from);
    let assignee = match assignee_id(change)? {
        None => None,
        Some(id) => {
            let user = ctx.assignee.filter(|u| u.id == id).ok_or_else(|| {
                CoreError::Classification(format!("assignee {id} was not resolved"))
            })?;
            Some(AssigneeContact {
                id: user.id.clone(),
                display_name: user.display_name.clone(),
                contact: user.contact.clone(),
            })
        }
    };

    Ok(AuditDetail::AssignedIncident {
        assignee,
        previous_assignee,
        subject_title: ctx.subject_title.to_string(),
    })
}

/// Non-field events on an incident.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    IncidentCreated(Incident),
    IncidentDeleted(Incident),
    CommentAdded(Comment),
    CommentEdited { before: Comment, after: Comment },
    CommentDeleted(Comment),
    ReactionToggled {
        comment_id: String,
        emoji: String,
        added: bool,
    },
    AttachmentUploaded(Attachment),
    AttachmentDeleted(Attachment),
}

/// Classify a non-field domain event.
///
/// # Errors
///
/// Returns `CoreError::Classification` for an edit whose before and after
/// comments are different comments.
pub fn classify_event(event: DomainEvent) -> Result<AuditDetail, CoreError> {
    let detail = match event {
        DomainEvent::IncidentCreated(incident) => AuditDetail::CreatedIncident {
            title: incident.title,
            status: incident.status,
            priority: incident.priority,
        },
        DomainEvent::IncidentDeleted(incident) => AuditDetail::DeletedIncident {
            snapshot: incident.snapshot(),
        },
        DomainEvent::CommentAdded(comment) => AuditDetail::AddedComment {
            comment_id: comment.id,
            text: comment.body,
        },
        DomainEvent::CommentEdited { before, after } => {
            if before.id != after.id {
                return Err(CoreError::Classification(format!(
                    "comment edit spans two comments: {} and {}",
                    before.id, after.id
                )));
            }
            AuditDetail::EditedComment {
                comment_id: after.id,
                old_text: before.body,
                new_text: after.body,
            }
        }
        DomainEvent::CommentDeleted(comment) => AuditDetail::DeletedComment {
            comment_id: comment.id,
            text: comment.body,
        },
        DomainEvent::ReactionToggled {
            comment_id,
            emoji,
            added,
        } => AuditDetail::ToggledReaction {
            comment_id,
            emoji,
            added,
        },
        DomainEvent::AttachmentUploaded(attachment) => AuditDetail::UploadedAttachment {
            attachment_id: attachment.id,
            file_name: attachment.file_name,
            content_type: attachment.content_type,
            size_bytes: attachment.size_bytes,
        },
        DomainEvent::AttachmentDeleted(attachment) => AuditDetail::DeletedAttachment {
            attachment_id: attachment.id,
            file_name: attachment.file_name,
        },
    };
    Ok(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{AuditAction, IncidentStatus, Priority};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn user(id: &str, email: &str) -> UserProfile {
        UserProfile {
            id: id.into(),
            display_name: "Ada Lovelace".into(),
            contact: email.into(),
            created_at: Utc::now(),
        }
    }

    fn change(field: TrackedField, old: Value, new: Value) -> FieldChange {
        FieldChange {
            field,
            old_value: old,
            new_value: new,
        }
    }

    const CTX: ClassifyContext<'static> = ClassifyContext {
        subject_title: "Checkout latency",
        assignee: None,
    };

    #[rstest]
    #[case("closed")]
    #[case("archived")]
    fn closure_literals_classify_as_closed(#[case] literal: &str) {
        let detail =
            classify_change(&change(TrackedField::Status, json!("open"), json!(literal)), &CTX)
                .unwrap();
        assert_eq!(detail.action(), AuditAction::ClosedIncident);
        assert_eq!(
            detail,
            AuditDetail::ClosedIncident {
                old_status: json!("open"),
                new_status: json!(literal),
            }
        );
    }

    #[test]
    fn other_status_is_a_field_update() {
        let detail = classify_change(
            &change(TrackedField::Status, json!("open"), json!("resolved")),
            &CTX,
        )
        .unwrap();
        assert_eq!(detail.action(), AuditAction::UpdatedField);
    }

    #[test]
    fn assignment_embeds_resolved_contact() {
        let ada = user("usr-x", "ada@example.com");
        let ctx = ClassifyContext {
            subject_title: "Checkout latency",
            assignee: Some(&ada),
        };
        let detail = classify_change(
            &change(TrackedField::AssignedTo, json!(null), json!({"id": "usr-x"})),
            &ctx,
        )
        .unwrap();
        assert_eq!(
            detail,
            AuditDetail::AssignedIncident {
                assignee: Some(AssigneeContact {
                    id: "usr-x".into(),
                    display_name: "Ada Lovelace".into(),
                    contact: "ada@example.com".into(),
                }),
                previous_assignee: None,
                subject_title: "Checkout latency".into(),
            }
        );
    }

    #[test]
    fn unresolved_assignee_is_an_error() {
        let result = classify_change(
            &change(TrackedField::AssignedTo, json!(null), json!("usr-x")),
            &CTX,
        );
        assert!(matches!(result, Err(CoreError::Classification(_))));
    }

    #[test]
    fn mismatched_assignee_is_an_error() {
        let other = user("usr-y", "y@example.com");
        let ctx = ClassifyContext {
            subject_title: "t",
            assignee: Some(&other),
        };
        let result = classify_change(
            &change(TrackedField::AssignedTo, json!(null), json!("usr-x")),
            &ctx,
        );
        assert!(matches!(result, Err(CoreError::Classification(_))));
    }

    #[test]
    fn unassignment_has_no_assignee() {
        let detail = classify_change(
            &change(TrackedField::AssignedTo, json!("usr-x"), json!(null)),
            &CTX,
        )
        .unwrap();
        assert_eq!(
            detail,
            AuditDetail::AssignedIncident {
                assignee: None,
                previous_assignee: Some("usr-x".into()),
                subject_title: "Checkout latency".into(),
            }
        );
    }

    #[test]
    fn non_reference_assignee_is_invalid() {
        let result = classify_change(
            &change(TrackedField::AssignedTo, json!(null), json!(42)),
            &CTX,
        );
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn classify_changes_stops_on_first_error() {
        let changes = vec![
            change(TrackedField::Priority, json!("P3"), json!("P1")),
            change(TrackedField::AssignedTo, json!(null), json!("usr-x")),
        ];
        assert!(classify_changes(&changes, &CTX).is_err());
    }

    #[test]
    fn deleted_incident_captures_snapshot() {
        let now = Utc::now();
        let incident = Incident {
            id: "inc-00000001".into(),
            title: "DB outage".into(),
            description: None,
            status: IncidentStatus::Investigating,
            priority: Priority::P1,
            assigned_to: Some("usr-x".into()),
            responders: vec![],
            team: None,
            created_by: "usr-y".into(),
            created_at: now,
            updated_at: now,
        };
        let detail = classify_event(DomainEvent::IncidentDeleted(incident.clone())).unwrap();
        assert_eq!(
            detail,
            AuditDetail::DeletedIncident {
                snapshot: incident.snapshot()
            }
        );
    }

    #[test]
    fn comment_edit_across_comments_is_rejected() {
        let now = Utc::now();
        let before = Comment {
            id: "cmt-1".into(),
            incident_id: "inc-1".into(),
            author_id: "usr-1".into(),
            body: "a".into(),
            created_at: now,
            updated_at: now,
        };
        let after = Comment {
            id: "cmt-2".into(),
            ..before.clone()
        };
        let result = classify_event(DomainEvent::CommentEdited { before, after });
        assert!(matches!(result, Err(CoreError::Classification(_))));
    }
}
