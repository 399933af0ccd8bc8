//! Publication seam for persisted audit records.
//!
//! Sinks are injected into the service at construction time. Publishing is
//! best-effort: a sink error is reported to the caller of `publish` (the
//! broadcaster), which logs it and moves on.

use crate::entities::AuditRecord;
use crate::errors::SinkError;

/// A destination for persisted audit records (live observers, event logs).
///
/// Implementations must not block; slow consumers are the sink's problem.
pub trait EventSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Deliver one record.
    ///
    /// # Errors
    ///
    /// Returns `SinkError` if the record could not be delivered.
    fn publish(&self, record: &AuditRecord) -> Result<(), SinkError>;
}
