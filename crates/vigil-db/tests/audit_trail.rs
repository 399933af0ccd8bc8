//! Audit trail integration tests.
//!
//! End-to-end through `VigilService`: detection, classification, recording,
//! publication and the query service, against in-memory libSQL.

use std::sync::Arc;

use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;

use vigil_config::AuditConfig;
use vigil_core::audit_detail::AuditDetail;
use vigil_core::entities::{AuditRecord, UserProfile};
use vigil_core::enums::{AuditAction, IncidentStatus, Priority, SubjectType, TrackedField};
use vigil_core::errors::SinkError;
use vigil_core::events::EventSink;
use vigil_core::export::CSV_HEADERS;
use vigil_core::identity::RequestContext;
use vigil_db::VigilDb;
use vigil_db::error::DatabaseError;
use vigil_db::events::{Broadcaster, ChannelSink, JsonlSink};
use vigil_db::repos::audit::AuditQuery;
use vigil_db::repos::incident::NewIncident;
use vigil_db::service::VigilService;
use vigil_db::updates::incident::IncidentUpdateBuilder;

async fn service_with(broadcaster: Broadcaster) -> VigilService {
    let db = VigilDb::open_local(":memory:").await.unwrap();
    VigilService::from_db(db, broadcaster, AuditConfig::default())
}

async fn test_service() -> VigilService {
    service_with(Broadcaster::new()).await
}

struct Fixture {
    svc: VigilService,
    ada: UserProfile,
    ctx: RequestContext,
    incident_id: String,
}

async fn fixture_with(broadcaster: Broadcaster) -> Fixture {
    let svc = service_with(broadcaster).await;
    let ada = svc.create_user("Ada", "ada@example.com").await.unwrap();
    let ctx = RequestContext::new(&ada.id);
    let incident_id = svc
        .create_incident(&ctx, NewIncident::new("Checkout latency", Priority::P3))
        .await
        .unwrap()
        .value
        .id;
    Fixture {
        svc,
        ada,
        ctx,
        incident_id,
    }
}

async fn fixture() -> Fixture {
    fixture_with(Broadcaster::new()).await
}

async fn entries_for(svc: &VigilService, incident_id: &str) -> Vec<AuditRecord> {
    svc.query_audit_all(&AuditQuery {
        subject_id: Some(incident_id.to_string()),
        ..AuditQuery::default()
    })
    .await
    .unwrap()
}

struct FailingSink;

impl EventSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    fn publish(&self, _record: &AuditRecord) -> Result<(), SinkError> {
        Err(SinkError::Unavailable {
            sink: "failing".into(),
            reason: "connection reset".into(),
        })
    }
}

#[tokio::test]
async fn fresh_service_has_an_empty_trail() {
    let svc = test_service().await;
    let page = svc.query_audit(&AuditQuery::default()).await.unwrap();
    assert_eq!(page.total, 0);
    assert_eq!(page.total_pages, 0);
    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, 20);
    assert!(svc.broadcaster().sink_count() == 0);
}

// ---------------------------------------------------------------------------
// Detection and classification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn priority_and_assignment_yield_two_entries() {
    let f = fixture().await;
    let grace = f
        .svc
        .create_user("Grace", "grace@example.com")
        .await
        .unwrap();

    let update = IncidentUpdateBuilder::new()
        .priority(Priority::P1)
        .assigned_to(Some(grace.id.as_str().into()))
        .build();
    let result = f
        .svc
        .update_incident(&f.ctx, &f.incident_id, &update)
        .await
        .unwrap();

    assert_eq!(result.entries.len(), 2);
    assert_eq!(
        result.entries[0].detail,
        AuditDetail::UpdatedField {
            field: TrackedField::Priority,
            old_value: json!("P3"),
            new_value: json!("P1"),
        }
    );
    match &result.entries[1].detail {
        AuditDetail::AssignedIncident {
            assignee: Some(assignee),
            subject_title,
            ..
        } => {
            assert_eq!(assignee.contact, "grace@example.com");
            assert_eq!(subject_title, "Checkout latency");
        }
        other => panic!("expected an assignment, got {other:?}"),
    }
}

#[tokio::test]
async fn reordered_responders_record_nothing() {
    let f = fixture().await;
    f.svc
        .update_incident_json(&f.ctx, &f.incident_id, &json!({"responders": ["usr-a", "usr-b"]}))
        .await
        .unwrap();

    let result = f
        .svc
        .update_incident_json(
            &f.ctx,
            &f.incident_id,
            &json!({"responders": [{"id": "usr-b"}, "usr-a"]}),
        )
        .await
        .unwrap();
    assert!(result.entries.is_empty());
}

#[tokio::test]
async fn expanded_reference_to_current_assignee_is_a_noop() {
    let f = fixture().await;
    let grace = f.svc.create_user("Grace", "grace@example.com").await.unwrap();
    f.svc
        .update_incident_json(&f.ctx, &f.incident_id, &json!({"assigned_to": grace.id}))
        .await
        .unwrap();

    let result = f
        .svc
        .update_incident_json(
            &f.ctx,
            &f.incident_id,
            &json!({"assigned_to": {"_id": grace.id, "display_name": "Grace"}}),
        )
        .await
        .unwrap();
    assert!(result.entries.is_empty());
}

#[tokio::test]
async fn reference_carrying_both_id_keys_assigns() {
    let f = fixture().await;
    let grace = f.svc.create_user("Grace", "grace@example.com").await.unwrap();

    let result = f
        .svc
        .update_incident_json(
            &f.ctx,
            &f.incident_id,
            &json!({"assigned_to": {"_id": grace.id, "id": grace.id, "display_name": "Grace"}}),
        )
        .await
        .unwrap();
    assert_eq!(result.entries.len(), 1);
    assert_eq!(result.entries[0].action, AuditAction::AssignedIncident);
    assert_eq!(result.value.assigned_to.as_deref(), Some(grace.id.as_str()));
}

#[tokio::test]
async fn field_change_records_the_values_as_sent() {
    let f = fixture().await;
    let responders = json!([{"_id": "usr-a", "email": "a@x"}]);

    let result = f
        .svc
        .update_incident_json(&f.ctx, &f.incident_id, &json!({"responders": responders}))
        .await
        .unwrap();
    assert_eq!(result.entries.len(), 1);
    let AuditDetail::UpdatedField {
        field, new_value, ..
    } = &result.entries[0].detail
    else {
        panic!("expected a field update, got {:?}", result.entries[0].detail);
    };
    assert_eq!(*field, TrackedField::Responders);
    assert_eq!(*new_value, responders);
    assert_eq!(result.value.responders, vec!["usr-a".to_string()]);
}

#[tokio::test]
async fn clearing_an_empty_list_is_a_noop_both_ways() {
    let f = fixture().await;
    for payload in [json!({"responders": null}), json!({"responders": []})] {
        let result = f
            .svc
            .update_incident_json(&f.ctx, &f.incident_id, &payload)
            .await
            .unwrap();
        assert!(result.entries.is_empty(), "{payload} should be a no-op");
    }

    f.svc
        .update_incident_json(&f.ctx, &f.incident_id, &json!({"responders": ["usr-a"]}))
        .await
        .unwrap();
    let cleared = f
        .svc
        .update_incident_json(&f.ctx, &f.incident_id, &json!({"responders": null}))
        .await
        .unwrap();
    assert_eq!(cleared.entries.len(), 1);
    assert!(cleared.value.responders.is_empty());
}

#[tokio::test]
async fn unassignment_is_an_assignment_without_assignee() {
    let f = fixture().await;
    let grace = f.svc.create_user("Grace", "grace@example.com").await.unwrap();
    f.svc
        .update_incident_json(&f.ctx, &f.incident_id, &json!({"assigned_to": grace.id}))
        .await
        .unwrap();

    let result = f
        .svc
        .update_incident_json(&f.ctx, &f.incident_id, &json!({"assigned_to": null}))
        .await
        .unwrap();
    assert_eq!(
        result.entries[0].detail,
        AuditDetail::AssignedIncident {
            assignee: None,
            previous_assignee: Some(grace.id.clone()),
            subject_title: "Checkout latency".into(),
        }
    );
    assert_eq!(result.value.assigned_to, None);
}

#[tokio::test]
async fn three_field_update_shares_one_request_id() {
    let f = fixture().await;
    let ctx = f.ctx.clone().with_request_id("req-3fields");

    let update = IncidentUpdateBuilder::new()
        .title("Checkout latency in eu-west")
        .priority(Priority::P2)
        .team(Some("team-payments".into()))
        .build();
    f.svc
        .update_incident(&ctx, &f.incident_id, &update)
        .await
        .unwrap();

    let page = f
        .svc
        .query_audit(&AuditQuery {
            request_id: Some("req-3fields".into()),
            ..AuditQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    let mut fields: Vec<TrackedField> = page
        .entries
        .iter()
        .filter_map(|e| e.detail.field())
        .collect();
    fields.sort_by_key(|f| f.as_str());
    assert_eq!(
        fields,
        vec![TrackedField::Priority, TrackedField::Team, TrackedField::Title]
    );
}

// ---------------------------------------------------------------------------
// Closure and legacy literals
// ---------------------------------------------------------------------------

#[tokio::test]
async fn closure_filter_matches_both_literals() {
    let f = fixture().await;

    f.svc
        .db()
        .conn()
        .execute(
            "INSERT INTO audit_log (id, action, performed_by, subject_type, subject_id, detail, created_at)
             VALUES ('aud-1e9ac700', 'archived_incident', ?1, 'incident', 'inc-legacy01',
                     '{\"kind\":\"archived_incident\",\"old_status\":\"resolved\",\"new_status\":\"archived\"}',
                     '2020-01-01T00:00:00.000000Z')",
            [f.ada.id.as_str()],
        )
        .await
        .unwrap();

    let closed = f
        .svc
        .update_incident(
            &f.ctx,
            &f.incident_id,
            &IncidentUpdateBuilder::new()
                .status(IncidentStatus::Closed)
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(closed.entries[0].action, AuditAction::ClosedIncident);

    let page = f
        .svc
        .query_audit(&AuditQuery {
            action: Some(AuditAction::ClosedIncident),
            ..AuditQuery::default()
        })
        .await
        .unwrap();
    let ids: Vec<&str> = page.entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec![closed.entries[0].id.as_str(), "aud-1e9ac700"]);
    assert!(page
        .entries
        .iter()
        .all(|e| e.action == AuditAction::ClosedIncident));
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn assignment_keeps_contact_after_rename() {
    let f = fixture().await;
    let grace = f.svc.create_user("Grace", "grace@example.com").await.unwrap();
    let assigned = f
        .svc
        .update_incident_json(&f.ctx, &f.incident_id, &json!({"assigned_to": grace.id}))
        .await
        .unwrap();

    f.svc.rename_user(&grace.id, "Rear Admiral Hopper").await.unwrap();

    let stored = f
        .svc
        .get_audit_entry(&assigned.entries[0].id)
        .await
        .unwrap();
    match stored.detail {
        AuditDetail::AssignedIncident {
            assignee: Some(assignee),
            ..
        } => assert_eq!(assignee.display_name, "Grace"),
        other => panic!("expected an assignment, got {other:?}"),
    }
}

#[tokio::test]
async fn deleted_subject_keeps_its_history() {
    let f = fixture().await;
    f.svc
        .add_comment(&f.ctx, &f.incident_id, "investigating")
        .await
        .unwrap();
    f.svc.delete_incident(&f.ctx, &f.incident_id).await.unwrap();

    let entries = entries_for(&f.svc, &f.incident_id).await;
    let actions: Vec<AuditAction> = entries.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::DeletedIncident,
            AuditAction::AddedComment,
            AuditAction::CreatedIncident,
        ]
    );
    assert!(entries.iter().all(|e| e.subject.title.is_none()));
    assert_eq!(entries[0].performed_by.display_name, "Ada");
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_mutations_record_nothing() {
    let f = fixture().await;
    let before = entries_for(&f.svc, &f.incident_id).await.len();

    let untracked = f
        .svc
        .update_incident_json(&f.ctx, &f.incident_id, &json!({"created_by": "usr-x"}))
        .await;
    assert!(matches!(untracked, Err(DatabaseError::Validation(_))));

    let missing = f
        .svc
        .update_incident_json(&f.ctx, "inc-missing", &json!({"priority": "P1"}))
        .await;
    assert!(matches!(missing, Err(DatabaseError::NotFound { .. })));

    let stranger = f
        .svc
        .update_incident_json(
            &RequestContext::new("usr-stranger"),
            &f.incident_id,
            &json!({"priority": "P1"}),
        )
        .await;
    assert!(matches!(stranger, Err(DatabaseError::NotFound { .. })));

    let ghost_assignee = f
        .svc
        .update_incident_json(
            &f.ctx,
            &f.incident_id,
            &json!({"priority": "P1", "assigned_to": "usr-ghost"}),
        )
        .await;
    assert!(matches!(ghost_assignee, Err(DatabaseError::NotFound { .. })));

    assert_eq!(entries_for(&f.svc, &f.incident_id).await.len(), before);
    assert_eq!(
        f.svc.get_incident(&f.incident_id).await.unwrap().priority,
        Priority::P3
    );
}

#[tokio::test]
async fn failing_sink_does_not_fail_the_mutation() {
    let channel = Arc::new(ChannelSink::new(16));
    let mut rx = channel.subscribe();
    let broadcaster = Broadcaster::new()
        .with_sink(Arc::new(FailingSink))
        .with_sink(channel.clone());
    let f = fixture_with(broadcaster).await;
    let created = rx.recv().await.unwrap();
    assert_eq!(created.action, AuditAction::CreatedIncident);

    let result = f
        .svc
        .update_incident_json(&f.ctx, &f.incident_id, &json!({"priority": "P2"}))
        .await
        .unwrap();
    assert_eq!(result.entries.len(), 1);
    assert_eq!(rx.recv().await.unwrap(), result.entries[0]);
}

// ---------------------------------------------------------------------------
// Live delivery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn live_events_match_query_shape_and_order() {
    let channel = Arc::new(ChannelSink::new(16));
    let f = fixture_with(Broadcaster::new().with_sink(channel.clone())).await;
    let mut rx = channel.subscribe();

    let update = IncidentUpdateBuilder::new()
        .status(IncidentStatus::Investigating)
        .priority(Priority::P1)
        .build();
    let result = f
        .svc
        .update_incident(&f.ctx, &f.incident_id, &update)
        .await
        .unwrap();

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!(vec![first.clone(), second], result.entries);
    assert_eq!(f.svc.get_audit_entry(&first.id).await.unwrap(), first);
}

#[tokio::test]
async fn jsonl_sink_mirrors_the_trail() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(JsonlSink::new(dir.path().join("audit.jsonl")).unwrap());
    let f = fixture_with(Broadcaster::new().with_sink(sink.clone())).await;
    f.svc
        .add_comment(&f.ctx, &f.incident_id, "paged the DBA")
        .await
        .unwrap();
    sink.flush().await.unwrap();

    let logged: Vec<AuditRecord> = serde_jsonlines::json_lines(sink.path())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let mut stored = entries_for(&f.svc, &f.incident_id).await;
    stored.reverse();
    assert_eq!(logged, stored);
}

// ---------------------------------------------------------------------------
// Query service
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pages_concatenate_to_the_full_set() {
    let f = fixture().await;
    for n in 0..6 {
        f.svc
            .add_comment(&f.ctx, &f.incident_id, &format!("update {n}"))
            .await
            .unwrap();
    }
    let all = f.svc.query_audit_all(&AuditQuery::default()).await.unwrap();
    assert_eq!(all.len(), 7);

    let mut concatenated = Vec::new();
    for page in 1..=3 {
        let result = f
            .svc
            .query_audit(&AuditQuery {
                page: Some(page),
                page_size: Some(3),
                ..AuditQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(result.total, 7);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.page, page);
        concatenated.extend(result.entries);
    }
    assert_eq!(concatenated, all);

    let beyond = f
        .svc
        .query_audit(&AuditQuery {
            page: Some(4),
            page_size: Some(3),
            ..AuditQuery::default()
        })
        .await
        .unwrap();
    assert!(beyond.entries.is_empty());
}

#[tokio::test]
async fn filters_combine() {
    let f = fixture().await;
    let grace = f.svc.create_user("Grace", "grace@example.com").await.unwrap();
    let grace_ctx = RequestContext::new(&grace.id);
    f.svc
        .add_comment(&grace_ctx, &f.incident_id, "on it")
        .await
        .unwrap();
    f.svc
        .add_comment(&f.ctx, &f.incident_id, "thanks")
        .await
        .unwrap();

    let by_grace = f
        .svc
        .query_audit(&AuditQuery {
            performer: Some(grace.id.clone()),
            action: Some(AuditAction::AddedComment),
            subject_type: Some(SubjectType::Incident),
            subject_id: Some(f.incident_id.clone()),
            ..AuditQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(by_grace.total, 1);
    assert_eq!(by_grace.entries[0].performed_by.display_name, "Grace");
}

#[tokio::test]
async fn date_range_includes_the_whole_end_day() {
    let f = fixture().await;
    let today = Utc::now().date_naive();

    let inclusive = f
        .svc
        .query_audit(&AuditQuery {
            start_date: Some(today),
            end_date: Some(today),
            ..AuditQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(inclusive.total, 1);

    let before = f
        .svc
        .query_audit(&AuditQuery {
            end_date: today.pred_opt(),
            ..AuditQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(before.total, 0);
}

#[tokio::test]
async fn recent_count_ignores_old_entries() {
    let f = fixture().await;
    f.svc
        .db()
        .conn()
        .execute(
            "INSERT INTO audit_log (id, action, performed_by, subject_type, subject_id, detail, created_at)
             VALUES ('aud-01d00001', 'added_comment', ?1, 'incident', ?2,
                     '{\"kind\":\"added_comment\",\"comment_id\":\"cmt-old\",\"text\":\"old\"}',
                     '2021-06-01T12:00:00.000000Z')",
            [f.ada.id.as_str(), f.incident_id.as_str()],
        )
        .await
        .unwrap();

    let recent = f.svc.count_recent_audit().await.unwrap();
    assert_eq!(recent.count, 1);
    assert_eq!(recent.window_hours, 24);
}

#[tokio::test]
async fn csv_export_covers_the_filtered_set() {
    let f = fixture().await;
    for n in 0..3 {
        f.svc
            .add_comment(&f.ctx, &f.incident_id, &format!("note, {n}"))
            .await
            .unwrap();
    }

    let csv = f
        .svc
        .export_audit_csv(&AuditQuery {
            action: Some(AuditAction::AddedComment),
            page_size: Some(1),
            ..AuditQuery::default()
        })
        .await
        .unwrap();
    let lines: Vec<&str> = csv.split("\r\n").filter(|l| !l.is_empty()).collect();
    assert_eq!(lines[0], CSV_HEADERS.join(","));
    assert_eq!(lines.len(), 4);
    assert!(lines[1].contains("note, 2"));
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_updates_both_record() {
    let f = fixture().await;
    let first = IncidentUpdateBuilder::new().priority(Priority::P1).build();
    let second = IncidentUpdateBuilder::new().priority(Priority::P2).build();

    let (a, b) = tokio::join!(
        f.svc.update_incident(&f.ctx, &f.incident_id, &first),
        f.svc.update_incident(&f.ctx, &f.incident_id, &second),
    );
    assert_eq!(a.unwrap().entries.len(), 1);
    assert_eq!(b.unwrap().entries.len(), 1);

    let priority_changes = f
        .svc
        .query_audit(&AuditQuery {
            action: Some(AuditAction::UpdatedField),
            ..AuditQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(priority_changes.total, 2);
}
