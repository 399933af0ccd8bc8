//! Attachment repository. Only metadata is stored; the bytes live elsewhere.

use vigil_core::classify::{DomainEvent, classify_event};
use vigil_core::clock::format_timestamp;
use vigil_core::entities::{Attachment, AuditRecord};
use vigil_core::identity::RequestContext;
use vigil_core::ids::PREFIX_ATTACHMENT;

use crate::error::DatabaseError;
use crate::helpers::parse_datetime;
use crate::repos::incident::subject_of;
use crate::service::{Audited, VigilService};

const SELECT_COLS: &str =
    "id, incident_id, file_name, content_type, size_bytes, uploaded_by, created_at";

fn row_to_attachment(row: &libsql::Row) -> Result<Attachment, DatabaseError> {
    let size: i64 = row.get(4)?;
    Ok(Attachment {
        id: row.get(0)?,
        incident_id: row.get(1)?,
        file_name: row.get(2)?,
        content_type: row.get(3)?,
        size_bytes: u64::try_from(size)
            .map_err(|e| DatabaseError::InvalidState(format!("attachment size {size}: {e}")))?,
        uploaded_by: row.get(5)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

impl VigilService {
    /// Register an uploaded file against an incident.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if the performer or incident does not
    /// exist, `DatabaseError::Validation` for a blank file name.
    pub async fn record_attachment(
        &self,
        ctx: &RequestContext,
        incident_id: &str,
        file_name: &str,
        content_type: &str,
        size_bytes: u64,
    ) -> Result<Audited<Attachment>, DatabaseError> {
        let performer = self.get_user(&ctx.performed_by).await?;
        let incident = self.get_incident(incident_id).await?;
        if file_name.trim().is_empty() {
            return Err(DatabaseError::Validation("file name is required".into()));
        }
        let size = i64::try_from(size_bytes).map_err(|_| {
            DatabaseError::Validation(format!("attachment size {size_bytes} is too large"))
        })?;

        let id = self.db().generate_id(PREFIX_ATTACHMENT).await?;
        let now = self.clock().now();
        self.db()
            .conn()
            .execute(
                "INSERT INTO attachments (id, incident_id, file_name, content_type, size_bytes, uploaded_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                libsql::params![
                    id.as_str(),
                    incident_id,
                    file_name,
                    content_type,
                    size,
                    performer.id.as_str(),
                    format_timestamp(&now)
                ],
            )
            .await?;

        let attachment = Attachment {
            id,
            incident_id: incident_id.to_string(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            size_bytes,
            uploaded_by: performer.id.clone(),
            created_at: now,
        };
        let detail = classify_event(DomainEvent::AttachmentUploaded(attachment.clone()))?;
        let entry = self
            .record(&performer, &subject_of(&incident), detail, ctx.request_id.as_deref())
            .await?;

        Ok(Audited {
            value: attachment,
            entries: vec![entry],
        })
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no attachment has this id.
    pub async fn get_attachment(&self, id: &str) -> Result<Attachment, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM attachments WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("attachment", id))?;
        row_to_attachment(&row)
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_attachments(
        &self,
        incident_id: &str,
    ) -> Result<Vec<Attachment>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM attachments WHERE incident_id = ?1 ORDER BY created_at, id"
                ),
                [incident_id],
            )
            .await?;
        let mut attachments = Vec::new();
        while let Some(row) = rows.next().await? {
            attachments.push(row_to_attachment(&row)?);
        }
        Ok(attachments)
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if the performer or attachment does
    /// not exist.
    pub async fn delete_attachment(
        &self,
        ctx: &RequestContext,
        attachment_id: &str,
    ) -> Result<AuditRecord, DatabaseError> {
        let performer = self.get_user(&ctx.performed_by).await?;
        let attachment = self.get_attachment(attachment_id).await?;
        let incident = self.get_incident(&attachment.incident_id).await?;
        let detail = classify_event(DomainEvent::AttachmentDeleted(attachment))?;

        self.db()
            .conn()
            .execute("DELETE FROM attachments WHERE id = ?1", [attachment_id])
            .await?;

        self.record(&performer, &subject_of(&incident), detail, ctx.request_id.as_deref())
            .await
    }
}
