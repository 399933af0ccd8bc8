//! Audit trail repository.
//!
//! Append-only recording of classified changes, plus the filtered, paginated
//! query service that reads them back with performer and subject expanded.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use vigil_core::audit_detail::AuditDetail;
use vigil_core::clock::format_timestamp;
use vigil_core::entities::{AuditRecord, PrincipalRef, SubjectRef, UserProfile};
use vigil_core::enums::{AuditAction, SubjectType};
use vigil_core::export::to_csv;
use vigil_core::identity::RequestContext;
use vigil_core::ids::PREFIX_AUDIT;
use vigil_core::responses::{AuditPage, RecentCount, total_pages};

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, parse_json};
use crate::service::VigilService;

const SELECT_RESOLVED: &str = "SELECT a.id, a.action, a.performed_by, a.subject_type, a.subject_id, \
     a.detail, a.request_id, a.created_at, u.display_name, u.contact, i.title \
     FROM audit_log a \
     LEFT JOIN users u ON u.id = a.performed_by \
     LEFT JOIN incidents i ON a.subject_type = 'incident' AND i.id = a.subject_id";

const ORDER_BY: &str = "ORDER BY a.created_at DESC, a.id DESC";

/// Filter criteria and page request for audit queries.
///
/// Dates are inclusive UTC calendar days: `end_date` covers the whole day.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub performer: Option<String>,
    pub action: Option<AuditAction>,
    pub subject_type: Option<SubjectType>,
    pub subject_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Lower bound used by trailing-window queries.
    pub since: Option<DateTime<Utc>>,
    pub request_id: Option<String>,
    /// 1-based; defaults to 1.
    pub page: Option<u32>,
    /// Defaults to and is clamped by the audit config.
    pub page_size: Option<u32>,
}

impl AuditQuery {
    fn where_clause(&self) -> Result<(String, Vec<libsql::Value>), DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref performer) = self.performer {
            params.push(libsql::Value::Text(performer.clone()));
            conditions.push(format!("a.performed_by = ?{}", params.len()));
        }
        if let Some(action) = self.action {
            let mut placeholders = Vec::new();
            for literal in action.stored_literals() {
                params.push(libsql::Value::Text((*literal).to_string()));
                placeholders.push(format!("?{}", params.len()));
            }
            conditions.push(format!("a.action IN ({})", placeholders.join(", ")));
        }
        if let Some(subject_type) = self.subject_type {
            params.push(libsql::Value::Text(subject_type.as_str().to_string()));
            conditions.push(format!("a.subject_type = ?{}", params.len()));
        }
        if let Some(ref subject_id) = self.subject_id {
            params.push(libsql::Value::Text(subject_id.clone()));
            conditions.push(format!("a.subject_id = ?{}", params.len()));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(DatabaseError::Validation(format!(
                    "start date {start} is after end date {end}"
                )));
            }
        }
        if let Some(start) = self.start_date {
            params.push(libsql::Value::Text(day_start(start)));
            conditions.push(format!("a.created_at >= ?{}", params.len()));
        }
        if let Some(end) = self.end_date {
            let next_day = end.succ_opt().ok_or_else(|| {
                DatabaseError::Validation(format!("end date {end} is out of range"))
            })?;
            params.push(libsql::Value::Text(day_start(next_day)));
            conditions.push(format!("a.created_at < ?{}", params.len()));
        }
        if let Some(since) = self.since {
            params.push(libsql::Value::Text(format_timestamp(&since)));
            conditions.push(format!("a.created_at >= ?{}", params.len()));
        }
        if let Some(ref request_id) = self.request_id {
            params.push(libsql::Value::Text(request_id.clone()));
            conditions.push(format!("a.request_id = ?{}", params.len()));
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        Ok((clause, params))
    }
}

fn day_start(day: NaiveDate) -> String {
    format_timestamp(&day.and_time(NaiveTime::MIN).and_utc())
}

fn row_to_record(row: &libsql::Row) -> Result<AuditRecord, DatabaseError> {
    let id: String = row.get(0)?;
    let action: AuditAction = parse_enum(&row.get::<String>(1)?)?;
    let detail: AuditDetail = parse_json(&row.get::<String>(5)?)?;
    if detail.action() != action {
        return Err(DatabaseError::InvalidState(format!(
            "audit entry {id} stores action {action} with a {} detail",
            detail.action()
        )));
    }
    let performer_id: String = row.get(2)?;
    let display_name = get_opt_string(row, 8)?.unwrap_or_else(|| performer_id.clone());

    Ok(AuditRecord {
        id,
        action,
        performed_by: PrincipalRef {
            id: performer_id,
            display_name,
            contact: get_opt_string(row, 9)?,
        },
        subject: SubjectRef {
            subject_type: parse_enum(&row.get::<String>(3)?)?,
            id: row.get(4)?,
            title: get_opt_string(row, 10)?,
        },
        detail,
        request_id: get_opt_string(row, 6)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

impl VigilService {
    /// Append an audit entry and publish it.
    ///
    /// The performer and subject are already resolved by the caller, so the
    /// returned record is complete without another read. Publication happens
    /// after the write is acknowledged and cannot fail this call.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` if the detail's shape contradicts
    /// its action, or a persistence error if the INSERT fails.
    pub async fn record(
        &self,
        performer: &UserProfile,
        subject: &SubjectRef,
        detail: AuditDetail,
        request_id: Option<&str>,
    ) -> Result<AuditRecord, DatabaseError> {
        detail.validate()?;

        let id = self.db().generate_id(PREFIX_AUDIT).await?;
        let created_at = self.clock().now();
        let action = detail.action();
        let detail_json = serde_json::to_string(&detail)?;

        self.db()
            .conn()
            .execute(
                "INSERT INTO audit_log (id, action, performed_by, subject_type, subject_id, detail, request_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                libsql::params![
                    id.as_str(),
                    action.as_str(),
                    performer.id.as_str(),
                    subject.subject_type.as_str(),
                    subject.id.as_str(),
                    detail_json,
                    request_id,
                    format_timestamp(&created_at)
                ],
            )
            .await?;

        let record = AuditRecord {
            id,
            action,
            performed_by: PrincipalRef {
                id: performer.id.clone(),
                display_name: performer.display_name.clone(),
                contact: Some(performer.contact.clone()),
            },
            subject: subject.clone(),
            detail,
            request_id: request_id.map(String::from),
            created_at,
        };

        tracing::info!(
            entry = %record.id,
            action = %record.action,
            subject = %record.subject.id,
            request_id = record.request_id.as_deref().unwrap_or("-"),
            "audit entry recorded"
        );
        self.broadcaster().publish(&record);
        Ok(record)
    }

    /// Resolve the performer from a request context and record one entry.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if the performer does not exist, or
    /// any error from [`Self::record`].
    pub async fn record_as(
        &self,
        ctx: &RequestContext,
        subject: &SubjectRef,
        detail: AuditDetail,
    ) -> Result<AuditRecord, DatabaseError> {
        let performer = self.get_user(&ctx.performed_by).await?;
        self.record(&performer, subject, detail, ctx.request_id.as_deref())
            .await
    }

    /// Fetch one resolved entry by id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no entry has this id.
    pub async fn get_audit_entry(&self, id: &str) -> Result<AuditRecord, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("{SELECT_RESOLVED} WHERE a.id = ?1"), [id])
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("audit entry", id))?;
        row_to_record(&row)
    }

    /// One page of the filtered trail, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` for an inverted date range, or
    /// `DatabaseError` if the query fails.
    pub async fn query_audit(&self, query: &AuditQuery) -> Result<AuditPage, DatabaseError> {
        let (where_clause, params) = query.where_clause()?;
        let page = query.page.unwrap_or(1).max(1);
        let page_size = self.config().effective_page_size(query.page_size);
        let total = self.count_where(&where_clause, params.clone()).await?;

        let offset = u64::from(page - 1) * u64::from(page_size);
        let sql = format!(
            "{SELECT_RESOLVED} {where_clause} {ORDER_BY} LIMIT {page_size} OFFSET {offset}"
        );
        let entries = self.fetch_records(&sql, params).await?;

        Ok(AuditPage {
            entries,
            total,
            page,
            page_size,
            total_pages: total_pages(total, page_size),
        })
    }

    /// The whole filtered trail, most recent first. Paging fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query_audit_all(
        &self,
        query: &AuditQuery,
    ) -> Result<Vec<AuditRecord>, DatabaseError> {
        let (where_clause, params) = query.where_clause()?;
        let sql = format!("{SELECT_RESOLVED} {where_clause} {ORDER_BY}");
        self.fetch_records(&sql, params).await
    }

    /// Export the filtered, sorted trail as CSV.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or serialization fails.
    pub async fn export_audit_csv(&self, query: &AuditQuery) -> Result<String, DatabaseError> {
        let records = self.query_audit_all(query).await?;
        Ok(to_csv(&records)?)
    }

    /// The `limit` most recent entries within the trailing window configured
    /// by `recent_window_hours`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn recent_audit(&self, limit: u32) -> Result<Vec<AuditRecord>, DatabaseError> {
        let (where_clause, params) = self.recent_window_query().where_clause()?;
        let sql = format!("{SELECT_RESOLVED} {where_clause} {ORDER_BY} LIMIT {limit}");
        self.fetch_records(&sql, params).await
    }

    /// Number of entries within the trailing window, for dashboards.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn count_recent_audit(&self) -> Result<RecentCount, DatabaseError> {
        let (where_clause, params) = self.recent_window_query().where_clause()?;
        let count = self.count_where(&where_clause, params).await?;
        Ok(RecentCount {
            window_hours: self.config().recent_window_hours,
            count,
        })
    }

    fn recent_window_query(&self) -> AuditQuery {
        AuditQuery {
            since: Some(Utc::now() - Duration::hours(i64::from(self.config().recent_window_hours))),
            ..AuditQuery::default()
        }
    }

    async fn count_where(
        &self,
        where_clause: &str,
        params: Vec<libsql::Value>,
    ) -> Result<u64, DatabaseError> {
        let sql = format!("SELECT COUNT(*) FROM audit_log a {where_clause}");
        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        let count: i64 = row.get(0)?;
        u64::try_from(count).map_err(|e| DatabaseError::Query(format!("negative count: {e}")))
    }

    async fn fetch_records(
        &self,
        sql: &str,
        params: Vec<libsql::Value>,
    ) -> Result<Vec<AuditRecord>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(sql, libsql::params_from_iter(params))
            .await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }
}
