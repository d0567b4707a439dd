//! Core persistence access for Jamlog.
//! This crate owns the store and every rule about reading and writing it.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod sync;

pub use config::{StoreConfig, StoreLocation};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::schema::{AttributeAccess, AttributeSpec, EntitySpec, Schema, ID_ATTRIBUTE};
pub use model::value::{AttributeKind, AttributeValue, FromAttribute, IntoAttribute};
pub use repo::attribute_repo::{
    AttributeRepository, SqliteAttributeRepository, StoreError, StoreResult, UpdateOutcome,
};
pub use service::persistence_controller::PersistenceController;
pub use sync::outbox::{PendingChange, RecordMerge, RemoteChange};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
