//! Store configuration chosen by the composition root.

use crate::model::schema::Schema;
use std::path::PathBuf;

/// Where the store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Durable SQLite file, created on first open.
    File(PathBuf),
    /// Private throwaway database; nothing survives the controller.
    InMemory,
}

/// Construction-time settings for a `PersistenceController`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub location: StoreLocation,
    /// Queue committed local writes in the sync outbox.
    pub cloud_sync: bool,
    pub schema: Schema,
}

impl StoreConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            cloud_sync: true,
            schema: Schema::jamlog(),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::InMemory,
            cloud_sync: true,
            schema: Schema::jamlog(),
        }
    }

    /// Picks the backend from a single in-memory flag, the app's only switch.
    pub fn for_mode(in_memory: bool, path: impl Into<PathBuf>) -> Self {
        if in_memory {
            Self::in_memory()
        } else {
            Self::file(path)
        }
    }

    pub fn with_cloud_sync(mut self, enabled: bool) -> Self {
        self.cloud_sync = enabled;
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn mode_label(&self) -> &'static str {
        match self.location {
            StoreLocation::File(_) => "file",
            StoreLocation::InMemory => "memory",
        }
    }
}
