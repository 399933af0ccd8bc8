//! # vigil-core
//!
//! Core types, change detection, and audit classification for Vigil.
//!
//! This crate provides the foundational types shared across all Vigil crates:
//! - Entity structs for incidents, users, comments, attachments and audit entries
//! - Closed enums for audit actions, tracked fields, statuses and priorities
//! - Value canonicalization and field-level change detection
//! - Classification of changes and domain events into typed audit details
//! - The `EventSink` seam used to publish persisted audit records
//! - Cross-cutting error types
//!
//! Nothing in here performs I/O; every function is testable without a database.

pub mod audit_detail;
pub mod canonical;
pub mod changes;
pub mod classify;
pub mod clock;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod events;
pub mod export;
pub mod identity;
pub mod ids;
pub mod responses;
