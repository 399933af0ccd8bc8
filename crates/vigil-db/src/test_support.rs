//! Shared test utilities for vigil-db unit tests.

#[cfg(test)]
pub(crate) mod helpers {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use vigil_config::AuditConfig;
    use vigil_core::audit_detail::AuditDetail;
    use vigil_core::entities::{AuditRecord, PrincipalRef, SubjectRef, UserProfile};
    use vigil_core::enums::{AuditAction, SubjectType, TrackedField};

    use crate::VigilDb;
    use crate::events::{Broadcaster, ChannelSink};
    use crate::service::VigilService;

    /// In-memory service with no sinks.
    pub async fn test_service() -> VigilService {
        let db = VigilDb::open_local(":memory:").await.unwrap();
        VigilService::from_db(db, Broadcaster::new(), AuditConfig::default())
    }

    /// In-memory service publishing to a channel sink the caller can subscribe to.
    pub async fn test_service_with_channel() -> (VigilService, Arc<ChannelSink>) {
        let db = VigilDb::open_local(":memory:").await.unwrap();
        let channel = Arc::new(ChannelSink::new(64));
        let broadcaster = Broadcaster::new().with_sink(channel.clone());
        (
            VigilService::from_db(db, broadcaster, AuditConfig::default()),
            channel,
        )
    }

    pub async fn create_test_user(
        svc: &VigilService,
        display_name: &str,
        contact: &str,
    ) -> UserProfile {
        svc.create_user(display_name, contact).await.unwrap()
    }

    /// A resolved priority change, for sink and notifier tests.
    pub fn sample_record(id: &str) -> AuditRecord {
        AuditRecord {
            id: id.to_string(),
            action: AuditAction::UpdatedField,
            performed_by: PrincipalRef {
                id: "usr-00000001".into(),
                display_name: "Grace Hopper".into(),
                contact: Some("grace@example.com".into()),
            },
            subject: SubjectRef {
                id: "inc-00000001".into(),
                subject_type: SubjectType::Incident,
                title: Some("Checkout latency".into()),
            },
            detail: AuditDetail::UpdatedField {
                field: TrackedField::Priority,
                old_value: json!("P3"),
                new_value: json!("P1"),
            },
            request_id: Some("req-00000001".into()),
            created_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap(),
        }
    }
}
