//! Repository implementations.
//!
//! Each module adds methods to [`crate::service::VigilService`] for one table.

pub mod attachment;
pub mod audit;
pub mod comment;
pub mod incident;
pub mod user;
