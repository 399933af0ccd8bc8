//! Incident repository: CRUD with per-change audit entries.

use vigil_core::changes::{FieldChange, detect};
use vigil_core::classify::{ClassifyContext, DomainEvent, assignee_id, classify_changes, classify_event};
use vigil_core::clock::format_timestamp;
use vigil_core::entities::{AuditRecord, Incident, SubjectRef};
use vigil_core::enums::{IncidentStatus, Priority, SubjectType, TrackedField};
use vigil_core::identity::RequestContext;
use vigil_core::ids::PREFIX_INCIDENT;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, parse_json};
use crate::service::{Audited, VigilService};
use crate::updates::incident::{IncidentUpdate, Reference};

const SELECT_COLS: &str = "id, title, description, status, priority, assigned_to, responders, \
     team, created_by, created_at, updated_at";

fn row_to_incident(row: &libsql::Row) -> Result<Incident, DatabaseError> {
    Ok(Incident {
        id: row.get(0)?,
        title: row.get(1)?,
        description: get_opt_string(row, 2)?,
        status: parse_enum(&row.get::<String>(3)?)?,
        priority: parse_enum(&row.get::<String>(4)?)?,
        assigned_to: get_opt_string(row, 5)?,
        responders: parse_json(&row.get::<String>(6)?)?,
        team: get_opt_string(row, 7)?,
        created_by: row.get(8)?,
        created_at: parse_datetime(&row.get::<String>(9)?)?,
        updated_at: parse_datetime(&row.get::<String>(10)?)?,
    })
}

/// The audit subject for an incident.
pub(crate) fn subject_of(incident: &Incident) -> SubjectRef {
    SubjectRef {
        id: incident.id.clone(),
        subject_type: SubjectType::Incident,
        title: Some(incident.title.clone()),
    }
}

/// Fields of a new incident. Status always starts `open`.
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub assigned_to: Option<String>,
    pub responders: Vec<String>,
    pub team: Option<String>,
}

impl NewIncident {
    #[must_use]
    pub fn new(title: impl Into<String>, priority: Priority) -> Self {
        Self {
            title: title.into(),
            description: None,
            priority,
            assigned_to: None,
            responders: Vec::new(),
            team: None,
        }
    }
}

fn responders_json(responders: Option<&Vec<Reference>>) -> Result<String, DatabaseError> {
    let ids: Vec<&str> = responders
        .map(|r| r.iter().map(Reference::id).collect())
        .unwrap_or_default();
    Ok(serde_json::to_string(&ids)?)
}

/// Column value for a changed field, taken from the update that changed it.
fn column_value(
    update: &IncidentUpdate,
    field: TrackedField,
) -> Result<libsql::Value, DatabaseError> {
    let text = |s: Option<&str>| s.map_or(libsql::Value::Null, |s| s.to_string().into());
    let missing = || DatabaseError::InvalidState(format!("change to {field} without a value"));

    let value = match field {
        TrackedField::Title => text(update.title.as_deref()),
        TrackedField::Description => {
            text(update.description.as_ref().ok_or_else(missing)?.as_deref())
        }
        TrackedField::Status => text(update.status.map(IncidentStatus::as_str)),
        TrackedField::Priority => text(update.priority.map(Priority::as_str)),
        TrackedField::AssignedTo => {
            text(update.assigned_to.as_ref().ok_or_else(missing)?.as_ref().map(Reference::id))
        }
        TrackedField::Responders => {
            responders_json(update.responders.as_ref().ok_or_else(missing)?.as_ref())?.into()
        }
        TrackedField::Team => {
            text(update.team.as_ref().ok_or_else(missing)?.as_ref().map(Reference::id))
        }
    };
    Ok(value)
}

impl VigilService {
    /// Create an incident and record `CreatedIncident`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if the performer or assignee does not
    /// exist, `DatabaseError::Validation` for a blank title.
    pub async fn create_incident(
        &self,
        ctx: &RequestContext,
        new: NewIncident,
    ) -> Result<Audited<Incident>, DatabaseError> {
        let performer = self.get_user(&ctx.performed_by).await?;
        if new.title.trim().is_empty() {
            return Err(DatabaseError::Validation("incident title is required".into()));
        }
        if let Some(ref assignee) = new.assigned_to {
            self.get_user(assignee).await?;
        }

        let id = self.db().generate_id(PREFIX_INCIDENT).await?;
        let now = self.clock().now();
        let incident = Incident {
            id,
            title: new.title,
            description: new.description,
            status: IncidentStatus::Open,
            priority: new.priority,
            assigned_to: new.assigned_to,
            responders: new.responders,
            team: new.team,
            created_by: performer.id.clone(),
            created_at: now,
            updated_at: now,
        };

        self.db()
            .conn()
            .execute(
                "INSERT INTO incidents (id, title, description, status, priority, assigned_to, responders, team, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                libsql::params![
                    incident.id.as_str(),
                    incident.title.as_str(),
                    incident.description.as_deref(),
                    incident.status.as_str(),
                    incident.priority.as_str(),
                    incident.assigned_to.as_deref(),
                    serde_json::to_string(&incident.responders)?,
                    incident.team.as_deref(),
                    incident.created_by.as_str(),
                    format_timestamp(&now),
                    format_timestamp(&now)
                ],
            )
            .await?;

        let detail = classify_event(DomainEvent::IncidentCreated(incident.clone()))?;
        let entry = self
            .record(&performer, &subject_of(&incident), detail, ctx.request_id.as_deref())
            .await?;

        Ok(Audited {
            value: incident,
            entries: vec![entry],
        })
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no incident has this id.
    pub async fn get_incident(&self, id: &str) -> Result<Incident, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM incidents WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("incident", id))?;
        row_to_incident(&row)
    }

    /// Incidents, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_incidents(
        &self,
        status: Option<IncidentStatus>,
        limit: u32,
    ) -> Result<Vec<Incident>, DatabaseError> {
        let mut params: Vec<libsql::Value> = Vec::new();
        let filter = match status {
            Some(status) => {
                params.push(status.as_str().into());
                "WHERE status = ?1"
            }
            None => "",
        };
        let sql = format!(
            "SELECT {SELECT_COLS} FROM incidents {filter} ORDER BY created_at DESC, id DESC LIMIT {limit}"
        );
        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;

        let mut incidents = Vec::new();
        while let Some(row) = rows.next().await? {
            incidents.push(row_to_incident(&row)?);
        }
        Ok(incidents)
    }

    /// Apply a partial update, recording one entry per changed field.
    ///
    /// Fields whose value is equivalent to the stored one are not changes.
    /// An update with no changes writes nothing and returns no entries.
    /// Everything is validated and classified before the incident is touched.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if the performer, the incident or a
    /// new assignee does not exist, `DatabaseError::Validation` for malformed
    /// values, and persistence errors from the write or the audit INSERTs.
    pub async fn update_incident(
        &self,
        ctx: &RequestContext,
        id: &str,
        update: &IncidentUpdate,
    ) -> Result<Audited<Incident>, DatabaseError> {
        let performer = self.get_user(&ctx.performed_by).await?;
        let incident = self.get_incident(id).await?;
        if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(DatabaseError::Validation("incident title cannot be blank".into()));
        }

        let payload = update.to_payload()?;
        let changes = detect(&incident.to_state()?, &payload, TrackedField::INCIDENT);
        if changes.is_empty() {
            tracing::debug!(incident = %id, "update changes nothing");
            return Ok(Audited {
                value: incident,
                entries: Vec::new(),
            });
        }

        let assignee = match changes.iter().find(|c| c.field == TrackedField::AssignedTo) {
            Some(change) => match assignee_id(change)? {
                Some(assignee) => Some(self.get_user(assignee).await?),
                None => None,
            },
            None => None,
        };
        let subject_title = update.title.as_deref().unwrap_or(&incident.title);
        let details = classify_changes(
            &changes,
            &ClassifyContext {
                subject_title,
                assignee: assignee.as_ref(),
            },
        )?;

        self.apply_changes(id, update, &changes).await?;
        let updated = self.get_incident(id).await?;

        let subject = subject_of(&updated);
        let mut entries = Vec::with_capacity(details.len());
        for detail in details {
            entries.push(
                self.record(&performer, &subject, detail, ctx.request_id.as_deref())
                    .await?,
            );
        }

        Ok(Audited {
            value: updated,
            entries,
        })
    }

    /// [`Self::update_incident`] for a raw JSON payload.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` for a non-object payload, unknown
    /// keys or mistyped values, plus everything `update_incident` returns.
    pub async fn update_incident_json(
        &self,
        ctx: &RequestContext,
        id: &str,
        payload: &serde_json::Value,
    ) -> Result<Audited<Incident>, DatabaseError> {
        let update = IncidentUpdate::from_json(payload)?;
        self.update_incident(ctx, id, &update).await
    }

    /// Delete an incident, recording a snapshot of it first.
    ///
    /// Comments and attachments go with it. Earlier audit entries stay.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if the performer or incident does not
    /// exist.
    pub async fn delete_incident(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<AuditRecord, DatabaseError> {
        let performer = self.get_user(&ctx.performed_by).await?;
        let incident = self.get_incident(id).await?;
        let subject = subject_of(&incident);
        let detail = classify_event(DomainEvent::IncidentDeleted(incident))?;

        self.db()
            .conn()
            .execute("DELETE FROM incidents WHERE id = ?1", [id])
            .await?;

        self.record(&performer, &subject, detail, ctx.request_id.as_deref())
            .await
    }

    async fn apply_changes(
        &self,
        id: &str,
        update: &IncidentUpdate,
        changes: &[FieldChange],
    ) -> Result<(), DatabaseError> {
        let mut sets = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();
        for change in changes {
            params.push(column_value(update, change.field)?);
            sets.push(format!("{} = ?{}", change.field.as_str(), params.len()));
        }

        params.push(format_timestamp(&self.clock().now()).into());
        sets.push(format!("updated_at = ?{}", params.len()));
        params.push(id.into());
        let sql = format!(
            "UPDATE incidents SET {} WHERE id = ?{}",
            sets.join(", "),
            params.len()
        );

        let changed = self
            .db()
            .conn()
            .execute(&sql, libsql::params_from_iter(params))
            .await?;
        if changed == 0 {
            return Err(DatabaseError::not_found("incident", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{create_test_user, test_service};
    use crate::updates::incident::IncidentUpdateBuilder;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use vigil_core::audit_detail::AuditDetail;
    use vigil_core::enums::AuditAction;

    #[tokio::test]
    async fn create_records_created_entry() {
        let svc = test_service().await;
        let user = create_test_user(&svc, "Ada", "ada@example.com").await;
        let ctx = RequestContext::new(&user.id).with_request_id("req-create");

        let created = svc
            .create_incident(&ctx, NewIncident::new("Checkout latency", Priority::P2))
            .await
            .unwrap();

        assert!(created.value.id.starts_with("inc-"));
        assert_eq!(created.value.status, IncidentStatus::Open);
        assert_eq!(created.entries.len(), 1);
        assert_eq!(created.entries[0].action, AuditAction::CreatedIncident);
        assert_eq!(created.entries[0].request_id.as_deref(), Some("req-create"));

        let fetched = svc.get_incident(&created.value.id).await.unwrap();
        assert_eq!(fetched, created.value);
    }

    #[tokio::test]
    async fn create_requires_known_performer() {
        let svc = test_service().await;
        let result = svc
            .create_incident(
                &RequestContext::new("usr-ghost"),
                NewIncident::new("x", Priority::P3),
            )
            .await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn update_writes_only_changed_columns() {
        let svc = test_service().await;
        let user = create_test_user(&svc, "Ada", "ada@example.com").await;
        let ctx = RequestContext::new(&user.id);
        let incident = svc
            .create_incident(&ctx, NewIncident::new("Disk full", Priority::P3))
            .await
            .unwrap()
            .value;

        let update = IncidentUpdateBuilder::new()
            .title("Disk full")
            .priority(Priority::P1)
            .responders(Some(vec!["usr-a".into(), "usr-b".into()]))
            .build();
        let result = svc.update_incident(&ctx, &incident.id, &update).await.unwrap();

        let fields: Vec<_> = result.entries.iter().map(|e| e.detail.field()).collect();
        assert_eq!(
            fields,
            vec![Some(TrackedField::Priority), Some(TrackedField::Responders)]
        );
        assert_eq!(result.value.priority, Priority::P1);
        assert_eq!(result.value.responders, vec!["usr-a", "usr-b"]);
        assert!(result.value.updated_at > incident.updated_at);
    }

    #[tokio::test]
    async fn noop_update_writes_nothing() {
        let svc = test_service().await;
        let user = create_test_user(&svc, "Ada", "ada@example.com").await;
        let ctx = RequestContext::new(&user.id);
        let incident = svc
            .create_incident(&ctx, NewIncident::new("Disk full", Priority::P3))
            .await
            .unwrap()
            .value;

        let result = svc
            .update_incident_json(
                &ctx,
                &incident.id,
                &json!({"priority": "P3", "responders": null, "team": null}),
            )
            .await
            .unwrap();
        assert!(result.entries.is_empty());
        assert_eq!(result.value.updated_at, incident.updated_at);
    }

    #[tokio::test]
    async fn closing_is_classified_as_closure() {
        let svc = test_service().await;
        let user = create_test_user(&svc, "Ada", "ada@example.com").await;
        let ctx = RequestContext::new(&user.id);
        let incident = svc
            .create_incident(&ctx, NewIncident::new("Disk full", Priority::P3))
            .await
            .unwrap()
            .value;

        let update = IncidentUpdateBuilder::new()
            .status(IncidentStatus::Archived)
            .build();
        let result = svc.update_incident(&ctx, &incident.id, &update).await.unwrap();
        assert_eq!(
            result.entries[0].detail,
            AuditDetail::ClosedIncident {
                old_status: json!("open"),
                new_status: json!("archived"),
            }
        );
    }

    #[tokio::test]
    async fn unknown_assignee_aborts_before_write() {
        let svc = test_service().await;
        let user = create_test_user(&svc, "Ada", "ada@example.com").await;
        let ctx = RequestContext::new(&user.id);
        let incident = svc
            .create_incident(&ctx, NewIncident::new("Disk full", Priority::P3))
            .await
            .unwrap()
            .value;

        let update = IncidentUpdateBuilder::new()
            .priority(Priority::P1)
            .assigned_to(Some("usr-ghost".into()))
            .build();
        let result = svc.update_incident(&ctx, &incident.id, &update).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));

        let unchanged = svc.get_incident(&incident.id).await.unwrap();
        assert_eq!(unchanged.priority, Priority::P3);
    }

    #[tokio::test]
    async fn delete_records_snapshot() {
        let svc = test_service().await;
        let user = create_test_user(&svc, "Ada", "ada@example.com").await;
        let ctx = RequestContext::new(&user.id);
        let incident = svc
            .create_incident(&ctx, NewIncident::new("Disk full", Priority::P4))
            .await
            .unwrap()
            .value;

        let entry = svc.delete_incident(&ctx, &incident.id).await.unwrap();
        assert_eq!(
            entry.detail,
            AuditDetail::DeletedIncident {
                snapshot: incident.snapshot()
            }
        );
        assert_eq!(entry.subject.title.as_deref(), Some("Disk full"));
        assert!(matches!(
            svc.get_incident(&incident.id).await,
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let svc = test_service().await;
        let user = create_test_user(&svc, "Ada", "ada@example.com").await;
        let ctx = RequestContext::new(&user.id);
        let a = svc
            .create_incident(&ctx, NewIncident::new("A", Priority::P3))
            .await
            .unwrap()
            .value;
        svc.create_incident(&ctx, NewIncident::new("B", Priority::P3))
            .await
            .unwrap();
        svc.update_incident(
            &ctx,
            &a.id,
            &IncidentUpdateBuilder::new()
                .status(IncidentStatus::Resolved)
                .build(),
        )
        .await
        .unwrap();

        let resolved = svc
            .list_incidents(Some(IncidentStatus::Resolved), 10)
            .await
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, a.id);
        assert_eq!(svc.list_incidents(None, 10).await.unwrap().len(), 2);
    }
}
