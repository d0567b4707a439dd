//! Declared entity schema and typed attribute values.
//!
//! # Responsibility
//! - Describe which entities and attributes exist, and how they map to SQL.
//! - Give generic fetch/update a compile-time value type instead of casts.
//!
//! # Invariants
//! - Every entity is identified by a UUID `id` attribute.
//! - SQL identifiers come from the schema only, never from caller input.

pub mod schema;
pub mod value;
