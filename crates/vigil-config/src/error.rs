//! Errors raised while assembling a [`crate::VigilConfig`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A provider could not be read or a value has the wrong type.
    #[error("failed to load vigil config: {0}")]
    Figment(#[from] figment::Error),

    /// A value parsed but is out of range for its section.
    #[error("[{section}] {key} is invalid: {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        reason: String,
    },
}
