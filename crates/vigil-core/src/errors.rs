//! Cross-cutting error types for Vigil.
//!
//! Errors that can originate from the pure domain layer. Storage errors live in
//! `vigil-db` (`DatabaseError`), which wraps these.

use thiserror::Error;

/// Errors raised while detecting, classifying or validating changes.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// Data failed validation (untracked field, malformed payload, shape mismatch).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A change or event could not be mapped to an audit action.
    #[error("Classification error: {0}")]
    Classification(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure to deliver a record to an event sink.
///
/// Never surfaced to the caller of a mutation.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink is closed or unreachable.
    #[error("Sink '{sink}' unavailable: {reason}")]
    Unavailable { sink: String, reason: String },

    /// The record could not be encoded for the sink.
    #[error("Sink '{sink}' could not encode record: {reason}")]
    Encode { sink: String, reason: String },
}
