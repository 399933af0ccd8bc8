//! Update builder types for entity mutations.
//!
//! Each builder produces an update struct with `Option` fields. Only `Some` fields
//! appear in the serialized payload, which is what change detection compares
//! against the persisted state and what generates SET clauses.

pub mod incident;
