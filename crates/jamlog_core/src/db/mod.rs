//! Store bootstrap for Jamlog.
//!
//! Opens the SQLite file (or a private in-memory database), brings it to the
//! latest migration and checks that the declared entity schema is actually
//! backed by tables. Nothing above this module sees a connection that failed
//! any of those steps.
//!
//! # Invariants
//! - `PRAGMA user_version` mirrors the last applied migration.
//! - A store stamped by a newer binary is refused as-is.
//! - Timestamps are Unix epoch milliseconds, produced by `NOW_MS_SQL`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, verify_schema_tables};

/// SQL expression for the current time in whole epoch milliseconds.
pub(crate) const NOW_MS_SQL: &str =
    "(CAST(ROUND((julianday('now') - 2440587.5) * 86400000) AS INTEGER))";

pub type DbResult<T> = Result<T, DbError>;

/// Why a store could not be opened or used.
#[derive(Debug)]
pub enum DbError {
    /// SQLite driver or I/O failure.
    Sqlite(rusqlite::Error),
    /// The file was migrated by a newer Jamlog build.
    UnsupportedSchemaVersion { found: u32, supported: u32 },
    /// Entity schema is malformed or not backed by the migrated tables.
    InvalidSchema(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => err.fmt(f),
            Self::UnsupportedSchemaVersion { found, supported } => write!(
                f,
                "store was written by schema version {found}, this build reads up to {supported}"
            ),
            Self::InvalidSchema(detail) => write!(f, "invalid entity schema: {detail}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        if let Self::Sqlite(err) = self {
            return Some(err);
        }
        None
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
