//! Cloud-sync bookkeeping.
//!
//! # Responsibility
//! - Record which committed local writes still need to reach other devices.
//! - Describe changes that arrive from other devices for merging.
//!
//! Transport and conflict resolution live outside this crate.

pub mod outbox;
