use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::audit_detail::AuditDetail;
use crate::enums::{AuditAction, SubjectType};

/// An append-only audit trail entry as it is stored.
///
/// `action` is always `detail.action()`; the column exists for filtering.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AuditEntry {
    pub id: String,
    pub action: AuditAction,
    pub performed_by: String,
    pub subject_type: SubjectType,
    pub subject_id: String,
    pub detail: AuditDetail,
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Display form of the acting principal.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PrincipalRef {
    pub id: String,
    /// Falls back to the id when the user no longer exists.
    pub display_name: String,
    pub contact: Option<String>,
}

/// Display form of the audited subject.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SubjectRef {
    pub id: String,
    pub subject_type: SubjectType,
    /// `None` once the subject has been deleted.
    pub title: Option<String>,
}

/// A persisted entry with performer and subject expanded.
///
/// This is the shape returned by queries and emitted on the event channel.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AuditRecord {
    pub id: String,
    pub action: AuditAction,
    pub performed_by: PrincipalRef,
    pub subject: SubjectRef,
    pub detail: AuditDetail,
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
