use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;
use vigil_config::VigilConfig;
use vigil_core::identity::RequestContext;
use vigil_core::ids::PREFIX_REQUEST;
use vigil_db::events::{Broadcaster, ChannelSink, JsonlSink};
use vigil_db::notify::{LogNotifier, spawn_notification_consumer};
use vigil_db::service::VigilService;

use crate::cli::GlobalFlags;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: VigilService,
    live: Arc<ChannelSink>,
    event_log: Option<Arc<JsonlSink>>,
    notifications: JoinHandle<()>,
}

impl AppContext {
    /// Open the database and wire the event sinks and notification consumer.
    pub async fn init(config: VigilConfig) -> anyhow::Result<Self> {
        if !config.database.is_in_memory() {
            if let Some(parent) = Path::new(&config.database.path)
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
            {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create database directory {}", parent.display())
                })?;
            }
        }

        let live = Arc::new(ChannelSink::new(config.audit.broadcast_capacity));
        let mut broadcaster = Broadcaster::new().with_sink(live.clone());
        let mut event_log = None;
        if let Some(path) = &config.audit.event_log {
            match JsonlSink::new(path) {
                Ok(sink) => {
                    let sink = Arc::new(sink);
                    broadcaster = broadcaster.with_sink(sink.clone());
                    event_log = Some(sink);
                }
                Err(error) => tracing::warn!(%error, path, "event log disabled"),
            }
        }
        let notifications = spawn_notification_consumer(live.subscribe(), LogNotifier);

        let service = VigilService::new_local(
            &config.database.path,
            broadcaster,
            config.audit.clone(),
        )
        .await
        .context("failed to initialize vigil-db service")?;

        Ok(Self {
            service,
            live,
            event_log,
            notifications,
        })
    }

    /// Build the request context for a mutation.
    ///
    /// `--by` is required. Without `--request-id` a fresh `req-` id is
    /// generated so the entries of one invocation stay correlated.
    pub async fn request_context(&self, flags: &GlobalFlags) -> anyhow::Result<RequestContext> {
        let performer = flags
            .by
            .as_deref()
            .context("mutations need a performer: pass --by <user-id>")?;
        let request_id = match &flags.request_id {
            Some(id) => id.clone(),
            None => self.service.db().generate_id(PREFIX_REQUEST).await?,
        };
        tracing::debug!(performer, request_id, "request context");
        Ok(RequestContext::new(performer).with_request_id(request_id))
    }

    /// Flush the event log, close the live channel and let the notification
    /// consumer drain.
    pub async fn shutdown(self) {
        let Self {
            service,
            live,
            event_log,
            notifications,
        } = self;
        if let Some(sink) = event_log {
            if let Err(error) = sink.flush().await {
                tracing::warn!(%error, "event log was not flushed");
            }
        }
        drop(service);
        drop(live);
        if let Err(error) = notifications.await {
            tracing::warn!(%error, "notification consumer did not shut down cleanly");
        }
    }
}
