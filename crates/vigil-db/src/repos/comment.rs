//! Comment repository: comments and reactions on incidents.

use vigil_core::classify::{DomainEvent, classify_event};
use vigil_core::clock::format_timestamp;
use vigil_core::entities::{AuditRecord, Comment};
use vigil_core::identity::RequestContext;
use vigil_core::ids::PREFIX_COMMENT;

use crate::error::DatabaseError;
use crate::helpers::parse_datetime;
use crate::repos::incident::subject_of;
use crate::service::{Audited, VigilService};

const SELECT_COLS: &str = "id, incident_id, author_id, body, created_at, updated_at";

fn row_to_comment(row: &libsql::Row) -> Result<Comment, DatabaseError> {
    Ok(Comment {
        id: row.get(0)?,
        incident_id: row.get(1)?,
        author_id: row.get(2)?,
        body: row.get(3)?,
        created_at: parse_datetime(&row.get::<String>(4)?)?,
        updated_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

fn require_body(body: &str) -> Result<(), DatabaseError> {
    if body.trim().is_empty() {
        return Err(DatabaseError::Validation("comment body is required".into()));
    }
    Ok(())
}

impl VigilService {
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if the performer or incident does not
    /// exist, `DatabaseError::Validation` for an empty body.
    pub async fn add_comment(
        &self,
        ctx: &RequestContext,
        incident_id: &str,
        body: &str,
    ) -> Result<Audited<Comment>, DatabaseError> {
        let performer = self.get_user(&ctx.performed_by).await?;
        let incident = self.get_incident(incident_id).await?;
        require_body(body)?;

        let id = self.db().generate_id(PREFIX_COMMENT).await?;
        let now = self.clock().now();
        self.db()
            .conn()
            .execute(
                "INSERT INTO comments (id, incident_id, author_id, body, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                libsql::params![
                    id.as_str(),
                    incident_id,
                    performer.id.as_str(),
                    body,
                    format_timestamp(&now),
                    format_timestamp(&now)
                ],
            )
            .await?;

        let comment = Comment {
            id,
            incident_id: incident_id.to_string(),
            author_id: performer.id.clone(),
            body: body.to_string(),
            created_at: now,
            updated_at: now,
        };
        let detail = classify_event(DomainEvent::CommentAdded(comment.clone()))?;
        let entry = self
            .record(&performer, &subject_of(&incident), detail, ctx.request_id.as_deref())
            .await?;

        Ok(Audited {
            value: comment,
            entries: vec![entry],
        })
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no comment has this id.
    pub async fn get_comment(&self, id: &str) -> Result<Comment, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM comments WHERE id = ?1"), [id])
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("comment", id))?;
        row_to_comment(&row)
    }

    /// Comments on an incident, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_comments(&self, incident_id: &str) -> Result<Vec<Comment>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM comments WHERE incident_id = ?1 ORDER BY created_at, id"
                ),
                [incident_id],
            )
            .await?;
        let mut comments = Vec::new();
        while let Some(row) = rows.next().await? {
            comments.push(row_to_comment(&row)?);
        }
        Ok(comments)
    }

    /// Replace a comment's text. Unchanged text records nothing.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if the performer or comment does not
    /// exist, `DatabaseError::Validation` for an empty body.
    pub async fn edit_comment(
        &self,
        ctx: &RequestContext,
        comment_id: &str,
        body: &str,
    ) -> Result<Audited<Comment>, DatabaseError> {
        let performer = self.get_user(&ctx.performed_by).await?;
        let before = self.get_comment(comment_id).await?;
        require_body(body)?;
        if before.body == body {
            return Ok(Audited {
                value: before,
                entries: Vec::new(),
            });
        }
        let incident = self.get_incident(&before.incident_id).await?;

        let now = self.clock().now();
        let after = Comment {
            body: body.to_string(),
            updated_at: now,
            ..before.clone()
        };
        let detail = classify_event(DomainEvent::CommentEdited {
            before,
            after: after.clone(),
        })?;

        self.db()
            .conn()
            .execute(
                "UPDATE comments SET body = ?1, updated_at = ?2 WHERE id = ?3",
                libsql::params![body, format_timestamp(&now), comment_id],
            )
            .await?;

        let entry = self
            .record(&performer, &subject_of(&incident), detail, ctx.request_id.as_deref())
            .await?;
        Ok(Audited {
            value: after,
            entries: vec![entry],
        })
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if the performer or comment does not
    /// exist.
    pub async fn delete_comment(
        &self,
        ctx: &RequestContext,
        comment_id: &str,
    ) -> Result<AuditRecord, DatabaseError> {
        let performer = self.get_user(&ctx.performed_by).await?;
        let comment = self.get_comment(comment_id).await?;
        let incident = self.get_incident(&comment.incident_id).await?;
        let detail = classify_event(DomainEvent::CommentDeleted(comment))?;

        self.db()
            .conn()
            .execute("DELETE FROM comments WHERE id = ?1", [comment_id])
            .await?;

        self.record(&performer, &subject_of(&incident), detail, ctx.request_id.as_deref())
            .await
    }

    /// Add the performer's reaction, or remove it if already present.
    ///
    /// The value is `true` when the reaction was added.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if the performer or comment does not
    /// exist, `DatabaseError::Validation` for an empty emoji.
    pub async fn toggle_reaction(
        &self,
        ctx: &RequestContext,
        comment_id: &str,
        emoji: &str,
    ) -> Result<Audited<bool>, DatabaseError> {
        let performer = self.get_user(&ctx.performed_by).await?;
        let comment = self.get_comment(comment_id).await?;
        let incident = self.get_incident(&comment.incident_id).await?;
        if emoji.trim().is_empty() {
            return Err(DatabaseError::Validation("emoji is required".into()));
        }

        let removed = self
            .db()
            .conn()
            .execute(
                "DELETE FROM comment_reactions WHERE comment_id = ?1 AND user_id = ?2 AND emoji = ?3",
                libsql::params![comment_id, performer.id.as_str(), emoji],
            )
            .await?;
        let added = removed == 0;
        if added {
            self.db()
                .conn()
                .execute(
                    "INSERT INTO comment_reactions (comment_id, user_id, emoji, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    libsql::params![
                        comment_id,
                        performer.id.as_str(),
                        emoji,
                        format_timestamp(&self.clock().now())
                    ],
                )
                .await?;
        }

        let detail = classify_event(DomainEvent::ReactionToggled {
            comment_id: comment_id.to_string(),
            emoji: emoji.to_string(),
            added,
        })?;
        let entry = self
            .record(&performer, &subject_of(&incident), detail, ctx.request_id.as_deref())
            .await?;
        Ok(Audited {
            value: added,
            entries: vec![entry],
        })
    }
}
