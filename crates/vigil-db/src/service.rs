//! Service layer orchestrating mutations with audit recording and publication.
//!
//! `VigilService` wraps `VigilDb` (raw database access), a `Broadcaster`
//! (event sinks) and a `MonotonicClock`. All repo methods are implemented as
//! `impl VigilService`.

use serde::Serialize;
use vigil_config::AuditConfig;
use vigil_core::clock::MonotonicClock;
use vigil_core::entities::AuditRecord;

use crate::VigilDb;
use crate::error::DatabaseError;
use crate::events::Broadcaster;

/// Result of an audited mutation.
#[derive(Debug, Clone, Serialize)]
pub struct Audited<T> {
    pub value: T,
    /// Entries recorded for the mutation, in recording order. Empty for a
    /// no-op.
    pub entries: Vec<AuditRecord>,
}

/// Orchestrates subject mutations with the audit trail.
///
/// Every audited mutation follows this protocol:
/// 1. Validate the request and resolve the performer
/// 2. Load the subject's current state
/// 3. Detect changed fields and classify every change (nothing is written if
///    any step so far fails)
/// 4. Apply the mutation
/// 5. Record one audit entry per classified change, publishing each as soon
///    as it is persisted
///
/// There is no transaction spanning step 4 and 5 or the entries of step 5:
/// each entry is valid on its own.
pub struct VigilService {
    db: VigilDb,
    broadcaster: Broadcaster,
    clock: MonotonicClock,
    config: AuditConfig,
}

impl VigilService {
    /// Create a new service over a local database.
    ///
    /// # Arguments
    ///
    /// * `db_path` — Path to the libSQL database file, or `":memory:"` for tests.
    /// * `broadcaster` — Sinks that receive every persisted entry.
    /// * `config` — Query and window settings.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(
        db_path: &str,
        broadcaster: Broadcaster,
        config: AuditConfig,
    ) -> Result<Self, DatabaseError> {
        let db = VigilDb::open_local(db_path).await?;
        Ok(Self::from_db(db, broadcaster, config))
    }

    /// Create from an existing `VigilDb` (for testing).
    #[must_use]
    pub fn from_db(db: VigilDb, broadcaster: Broadcaster, config: AuditConfig) -> Self {
        tracing::debug!(?broadcaster, "audit service ready");
        Self {
            db,
            broadcaster,
            clock: MonotonicClock::new(),
            config,
        }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &VigilDb {
        &self.db
    }

    /// Access the event broadcaster.
    #[must_use]
    pub const fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Access the per-process clock used for audit timestamps.
    #[must_use]
    pub const fn clock(&self) -> &MonotonicClock {
        &self.clock
    }

    /// Access the audit settings.
    #[must_use]
    pub const fn config(&self) -> &AuditConfig {
        &self.config
    }
}
