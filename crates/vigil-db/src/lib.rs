//! # vigil-db
//!
//! libSQL persistence and the audit pipeline for Vigil.
//!
//! Handles the relational state of incidents, users, comments and attachments,
//! and the append-only `audit_log`. Every mutation method on
//! [`service::VigilService`] detects what changed, classifies it, records one
//! audit entry per change and publishes each recorded entry to the configured
//! event sinks.

pub mod error;
pub mod events;
pub mod helpers;
mod migrations;
pub mod notify;
pub mod repos;
pub mod service;
pub mod updates;

#[cfg(test)]
mod test_support;

use error::DatabaseError;
use libsql::Builder;

/// libSQL handle shared by every repository.
///
/// The `Database` is held only to keep the connection alive.
pub struct VigilDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl VigilDb {
    /// Open (or create) the database file at `path` and bring the schema up
    /// to date. `":memory:"` gives a throwaway database.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Migration` if the schema cannot be applied and
    /// `DatabaseError::LibSql` if the file cannot be opened.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Per-connection setting.
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("enable foreign keys: {e}")))?;

        let handle = Self { db, conn };
        handle.run_migrations().await?;
        Ok(handle)
    }

    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// A fresh `{prefix}-xxxxxxxx` id, with the eight hex digits drawn from
    /// `randomblob(4)`, e.g. `"inc-0f3a9b21"`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT '{prefix}-' || lower(hex(randomblob(4)))"),
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }
}
