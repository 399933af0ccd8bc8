//! Audit trail query and publication settings.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_page_size() -> u32 {
    20
}

const fn default_max_page_size() -> u32 {
    200
}

const fn default_broadcast_capacity() -> usize {
    256
}

const fn default_recent_window_hours() -> u32 {
    24
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
    /// Page size used when a query does not ask for one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Upper bound on any requested page size.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Buffer of the live event channel before slow observers lag.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,

    /// Trailing window of the dashboard count, in hours.
    #[serde(default = "default_recent_window_hours")]
    pub recent_window_hours: u32,

    /// Optional JSONL file receiving every published entry.
    #[serde(default)]
    pub event_log: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            broadcast_capacity: default_broadcast_capacity(),
            recent_window_hours: default_recent_window_hours(),
            event_log: None,
        }
    }
}

impl AuditConfig {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_size == 0 {
            return Err(invalid("default_page_size", "must be greater than 0"));
        }
        if self.max_page_size < self.default_page_size {
            return Err(invalid(
                "max_page_size",
                format!("{} is below default_page_size {}", self.max_page_size, self.default_page_size),
            ));
        }
        if self.broadcast_capacity == 0 {
            return Err(invalid("broadcast_capacity", "must be greater than 0"));
        }
        if self.recent_window_hours == 0 {
            return Err(invalid("recent_window_hours", "must be greater than 0"));
        }
        Ok(())
    }

    /// Clamp a requested page size into `1..=max_page_size`, defaulting when absent.
    #[must_use]
    pub fn effective_page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size)
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        section: "audit",
        key,
        reason: reason.into(),
    }
}
