//! Core use-case services.
//!
//! # Responsibility
//! - Own the store connection and expose attribute-level use cases.
//! - Keep FFI/CLI layers decoupled from SQL and transaction handling.

pub mod persistence_controller;
