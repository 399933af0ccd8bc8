//! Downstream notifications driven by the audit event stream.
//!
//! Outbound side effects (email, SMS, chat) are not part of a mutation. They
//! consume published records from a [`ChannelSink`](crate::events::ChannelSink)
//! subscription, so a delivery failure can never fail or roll back the
//! mutation or its audit entries.

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use vigil_core::audit_detail::AuditDetail;
use vigil_core::entities::AuditRecord;

/// A message for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Contact address (normally an email).
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// Audit entry that triggered this notification.
    pub entry_id: String,
}

/// Delivery failure reported by a [`Notifier`].
#[derive(Debug, thiserror::Error)]
#[error("notification to {recipient} failed: {reason}")]
pub struct NotifyError {
    pub recipient: String,
    pub reason: String,
}

/// Outbound delivery channel.
pub trait Notifier: Send + Sync + 'static {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if delivery failed.
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Notifier that only logs. Used when no delivery channel is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %notification.recipient,
            subject = %notification.subject,
            entry = %notification.entry_id,
            "notification"
        );
        Ok(())
    }
}

/// Notifications a record should produce.
///
/// Assignments notify the new assignee. Closures and comments are only
/// announced to the performer's contact when known; everything else is silent.
#[must_use]
pub fn notifications_for(record: &AuditRecord) -> Vec<Notification> {
    let title = record.subject.title.as_deref().unwrap_or(&record.subject.id);
    match &record.detail {
        AuditDetail::AssignedIncident {
            assignee: Some(assignee),
            subject_title,
            ..
        } => vec![Notification {
            recipient: assignee.contact.clone(),
            subject: format!("You were assigned: {subject_title}"),
            body: format!(
                "{} assigned incident {} to you.",
                record.performed_by.display_name, record.subject.id
            ),
            entry_id: record.id.clone(),
        }],
        AuditDetail::ClosedIncident { new_status, .. } => record
            .performed_by
            .contact
            .iter()
            .map(|contact| Notification {
                recipient: contact.clone(),
                subject: format!("Incident closed: {title}"),
                body: format!("Status set to {}.", new_status.as_str().unwrap_or("closed")),
                entry_id: record.id.clone(),
            })
            .collect(),
        AuditDetail::AddedComment { text, .. } => record
            .performed_by
            .contact
            .iter()
            .map(|contact| Notification {
                recipient: contact.clone(),
                subject: format!("New comment on {title}"),
                body: text.clone(),
                entry_id: record.id.clone(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Spawn a task turning published records into notifications.
///
/// Runs until the channel closes. Lag and delivery failures are logged.
pub fn spawn_notification_consumer<N: Notifier>(
    mut rx: broadcast::Receiver<AuditRecord>,
    notifier: N,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(record) => {
                    for notification in notifications_for(&record) {
                        if let Err(e) = notifier.notify(&notification) {
                            tracing::warn!(entry = %record.id, error = %e, "notification failed");
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "notification consumer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
