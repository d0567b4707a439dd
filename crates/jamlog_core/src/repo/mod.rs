//! Repository layer over the declared entity tables.
//!
//! # Responsibility
//! - Address single attributes by `(entity, attribute, id)` triples.
//! - Keep SQL text and column decoding inside the persistence boundary.
//!
//! # Invariants
//! - Writes check attribute access and value kind before any SQL runs.
//! - Reads reject persisted data that contradicts the declared kind.

pub mod attribute_repo;
