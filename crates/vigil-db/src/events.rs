//! Event publication for persisted audit records.
//!
//! The [`Broadcaster`] fans each record out to every registered
//! [`EventSink`] in registration order. Delivery is best-effort: sink errors
//! are logged and absorbed, never returned to the mutation that produced the
//! record. Observers that connect later catch up through the query service,
//! not through replay.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use vigil_core::entities::AuditRecord;
use vigil_core::errors::SinkError;
use vigil_core::events::EventSink;

/// Fans records out to the configured sinks.
#[derive(Default, Clone)]
pub struct Broadcaster {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Broadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink. Sinks receive records in registration order.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Publish a record to every sink, logging failures.
    pub fn publish(&self, record: &AuditRecord) {
        for sink in &self.sinks {
            match sink.publish(record) {
                Ok(()) => tracing::trace!(sink = sink.name(), entry = %record.id, "published"),
                Err(e) => tracing::warn!(
                    sink = sink.name(),
                    entry = %record.id,
                    error = %e,
                    "audit event publication failed"
                ),
            }
        }
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("Broadcaster").field("sinks", &names).finish()
    }
}

/// Live observers, backed by a `tokio::sync::broadcast` channel.
///
/// `send` never blocks; observers slower than the channel capacity lag and
/// lose the oldest records. Having no observers is not an error.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: broadcast::Sender<AuditRecord>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Connect a new observer. It only sees records published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuditRecord> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventSink for ChannelSink {
    fn name(&self) -> &str {
        "channel"
    }

    fn publish(&self, record: &AuditRecord) -> Result<(), SinkError> {
        if self.tx.send(record.clone()).is_err() {
            tracing::trace!(entry = %record.id, "no live observers");
        }
        Ok(())
    }
}

/// Records queued for the JSONL writer before `publish` starts refusing them.
pub const JSONL_BACKLOG: usize = 1024;

enum WriterCommand {
    Append(AuditRecord),
    Flush(oneshot::Sender<()>),
}

/// Appends every published record to a JSONL file.
///
/// `publish` only enqueues. A writer task owns the file and appends each
/// batch with `serde_jsonlines::append_json_lines` on the blocking pool, so
/// a slow disk never holds up the recorder. A full backlog drops the record
/// and reports `SinkError::Unavailable`.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
    tx: mpsc::Sender<WriterCommand>,
}

impl std::fmt::Debug for WriterCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Append(record) => write!(f, "Append({})", record.id),
            Self::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl JsonlSink {
    /// Create a sink writing to `path` with the default backlog.
    ///
    /// # Errors
    ///
    /// See [`Self::with_backlog`].
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        Self::with_backlog(path, JSONL_BACKLOG)
    }

    /// Create the parent directories and spawn the writer task on the
    /// current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Unavailable` if the parent directory cannot be
    /// created or no tokio runtime is running.
    pub fn with_backlog(path: impl Into<PathBuf>, backlog: usize) -> Result<Self, SinkError> {
        let path = path.into();
        let unavailable = |reason: String| SinkError::Unavailable {
            sink: "jsonl".into(),
            reason,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| unavailable(e.to_string()))?;
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| unavailable(format!("writer needs a tokio runtime: {e}")))?;

        let (tx, rx) = mpsc::channel(backlog.max(1));
        runtime.spawn(run_writer(path.clone(), rx));
        Ok(Self { path, tx })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait until every record published before this call is on disk.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Unavailable` if the writer task has stopped.
    pub async fn flush(&self) -> Result<(), SinkError> {
        let stopped = || SinkError::Unavailable {
            sink: "jsonl".into(),
            reason: "writer task stopped".into(),
        };
        let (ack, done) = oneshot::channel();
        self.tx
            .send(WriterCommand::Flush(ack))
            .await
            .map_err(|_| stopped())?;
        done.await.map_err(|_| stopped())
    }
}

impl EventSink for JsonlSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn publish(&self, record: &AuditRecord) -> Result<(), SinkError> {
        self.tx
            .try_send(WriterCommand::Append(record.clone()))
            .map_err(|e| {
                let reason = match e {
                    mpsc::error::TrySendError::Full(_) => "writer backlog is full",
                    mpsc::error::TrySendError::Closed(_) => "writer task stopped",
                };
                SinkError::Unavailable {
                    sink: "jsonl".into(),
                    reason: reason.into(),
                }
            })
    }
}

async fn run_writer(path: PathBuf, mut rx: mpsc::Receiver<WriterCommand>) {
    while let Some(first) = rx.recv().await {
        let mut batch = Vec::new();
        let mut acks = Vec::new();
        let mut next = Some(first);
        while let Some(command) = next {
            match command {
                WriterCommand::Append(record) => batch.push(record),
                WriterCommand::Flush(ack) => acks.push(ack),
            }
            next = rx.try_recv().ok();
        }

        if !batch.is_empty() {
            let target = path.clone();
            let count = batch.len();
            let written = tokio::task::spawn_blocking(move || {
                serde_jsonlines::append_json_lines(&target, &batch)
            })
            .await;
            match written {
                Ok(Ok(())) => tracing::trace!(count, path = %path.display(), "appended audit events"),
                Ok(Err(error)) => {
                    tracing::warn!(%error, count, path = %path.display(), "audit event log append failed");
                }
                Err(error) => tracing::warn!(%error, count, "audit event log append task failed"),
            }
        }
        for ack in acks {
            let _ = ack.send(());
        }
    }
    tracing::debug!(path = %path.display(), "audit event log writer stopped");
}
