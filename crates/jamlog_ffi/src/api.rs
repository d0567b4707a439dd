//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Own the process-wide store handle (composition root for the app).
//! - Expose attribute get/set and sync outbox calls to Dart via FRB.
//!
//! # Invariants
//! - Exported functions never panic across the FFI boundary.
//! - The store is opened once per process and lives until exit; a second
//!   `init_store` with different settings is rejected.
//! - Identifiers cross the boundary as UUID strings.

use jamlog_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AttributeValue, PendingChange, PersistenceController, RecordMerge, RemoteChange, StoreConfig,
    UpdateOutcome,
};
use log::warn;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

const STORE_DB_FILE_NAME: &str = "jamlog.sqlite3";
const STORE_DB_PATH_ENV: &str = "JAMLOG_DB_PATH";

static STORE: Mutex<Option<PersistenceController>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking. Never throws.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Returns an empty string on success and the error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Attribute value as seen from Dart.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValueDto {
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    /// Hyphenated UUID string.
    Uuid(String),
    Blob(Vec<u8>),
}

/// Named initial value for `store_create_record`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeEntry {
    pub name: String,
    pub value: AttributeValueDto,
}

/// Generic action envelope for store writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreActionResponse {
    /// Whether the call completed without error.
    pub ok: bool,
    /// Records or outbox entries the call changed.
    pub affected: u32,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
}

impl StoreActionResponse {
    fn success(affected: u32, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            affected,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            affected: 0,
            message: message.into(),
        }
    }
}

/// One queued local change awaiting upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChangeItem {
    pub seq: i64,
    pub entity: String,
    pub record_id: String,
    pub attribute: String,
    pub changed_at: i64,
}

/// Outbox listing envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChangesResponse {
    pub items: Vec<PendingChangeItem>,
    pub message: String,
}

/// Opens the process-wide store.
///
/// Input semantics:
/// - `db_path`: durable store file; falls back to `JAMLOG_DB_PATH`, then to
///   `<temp>/jamlog.sqlite3`. Ignored when `in_memory` is set.
/// - `in_memory`: private throwaway store, for tests and previews.
/// - `cloud_sync`: queue local writes for upload.
///
/// # FFI contract
/// - Idempotent for identical settings; conflicting settings return an error.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_store(db_path: Option<String>, in_memory: bool, cloud_sync: bool) -> String {
    let config =
        StoreConfig::for_mode(in_memory, resolve_store_path(db_path)).with_cloud_sync(cloud_sync);
    let mut slot = lock_store();

    if let Some(active) = slot.as_ref() {
        if active.config() == &config {
            return String::new();
        }
        return format!(
            "store already initialized as {:?}; refusing to switch to {:?}",
            active.config().location,
            config.location
        );
    }

    match PersistenceController::open(config) {
        Ok(controller) => {
            *slot = Some(controller);
            String::new()
        }
        Err(err) => format!("init_store failed: {err}"),
    }
}

/// Creates one record with initial attribute values.
#[flutter_rust_bridge::frb(sync)]
pub fn store_create_record(
    entity: String,
    object_id: String,
    values: Vec<AttributeEntry>,
) -> StoreActionResponse {
    let result = parse_object_id(&object_id).and_then(|id| {
        let values = entries_into_core(values)?;
        let borrowed = borrow_entries(&values);
        with_store(|store| store.create_record(&entity, id, &borrowed))?
            .map_err(|err| err.to_string())
    });

    match result {
        Ok(()) => StoreActionResponse::success(1, "Record created."),
        Err(err) => StoreActionResponse::failure(format!("store_create_record failed: {err}")),
    }
}

/// Reads one attribute; `None` for missing record, unset value or any error.
///
/// # FFI contract
/// - Best-effort: failures are logged in core and never surfaced.
#[flutter_rust_bridge::frb(sync)]
pub fn store_fetch_attribute(
    entity: String,
    attribute: String,
    object_id: String,
) -> Option<AttributeValueDto> {
    let id = match parse_object_id(&object_id) {
        Ok(id) => id,
        Err(err) => {
            warn!("event=attribute_fetch module=ffi status=error error={err}");
            return None;
        }
    };

    with_store(|store| store.fetch_attribute::<AttributeValue>(&entity, &attribute, id))
        .ok()
        .flatten()
        .map(AttributeValueDto::from_core)
}

/// Overwrites one attribute and commits.
///
/// `affected` is 0 when no record has `object_id`; that is not an error.
#[flutter_rust_bridge::frb(sync)]
pub fn store_update_attribute(
    entity: String,
    attribute: String,
    value: AttributeValueDto,
    object_id: String,
) -> StoreActionResponse {
    let result = parse_object_id(&object_id).and_then(|id| {
        let value = value.into_core()?;
        with_store(|store| store.try_update_attribute(&entity, &attribute, value, id))?
            .map_err(|err| err.to_string())
    });

    match result {
        Ok(UpdateOutcome::Updated) => StoreActionResponse::success(1, "Attribute updated."),
        Ok(UpdateOutcome::NotFound) => {
            StoreActionResponse::success(0, "No matching record; nothing changed.")
        }
        Err(err) => StoreActionResponse::failure(format!("store_update_attribute failed: {err}")),
    }
}

/// Applies an attribute change received from another device.
#[flutter_rust_bridge::frb(sync)]
pub fn store_merge_remote_change(
    entity: String,
    attribute: String,
    value: AttributeValueDto,
    object_id: String,
) -> StoreActionResponse {
    let result = parse_object_id(&object_id).and_then(|record_id| {
        let change = RemoteChange {
            entity,
            record_id,
            attribute,
            value: value.into_core()?,
        };
        with_store(|store| store.merge_remote_change(&change))?.map_err(|err| err.to_string())
    });

    match result {
        Ok(UpdateOutcome::Updated) => StoreActionResponse::success(1, "Remote change merged."),
        Ok(UpdateOutcome::NotFound) => {
            StoreActionResponse::success(0, "No matching record; nothing merged.")
        }
        Err(err) => {
            StoreActionResponse::failure(format!("store_merge_remote_change failed: {err}"))
        }
    }
}

/// Applies a record created on another device (an outbox `id` entry).
///
/// `affected` is 1 when the record was inserted and 0 when it already existed
/// and only the given values were overwritten.
#[flutter_rust_bridge::frb(sync)]
pub fn store_merge_remote_record(
    entity: String,
    object_id: String,
    values: Vec<AttributeEntry>,
) -> StoreActionResponse {
    let result = parse_object_id(&object_id).and_then(|id| {
        let values = entries_into_core(values)?;
        let borrowed = borrow_entries(&values);
        with_store(|store| store.merge_remote_record(&entity, id, &borrowed))?
            .map_err(|err| err.to_string())
    });

    match result {
        Ok(RecordMerge::Inserted) => StoreActionResponse::success(1, "Remote record inserted."),
        Ok(RecordMerge::Updated) => {
            StoreActionResponse::success(0, "Record already present; values merged.")
        }
        Err(err) => {
            StoreActionResponse::failure(format!("store_merge_remote_record failed: {err}"))
        }
    }
}

/// Lists queued local changes oldest first.
#[flutter_rust_bridge::frb(sync)]
pub fn store_pending_changes(limit: Option<u32>) -> PendingChangesResponse {
    let result = with_store(|store| store.pending_changes(limit))
        .and_then(|listed| listed.map_err(|err| err.to_string()));

    match result {
        Ok(changes) => {
            let items = changes
                .into_iter()
                .map(to_pending_change_item)
                .collect::<Vec<_>>();
            let message = format!("{} pending change(s).", items.len());
            PendingChangesResponse { items, message }
        }
        Err(err) => PendingChangesResponse {
            items: Vec::new(),
            message: format!("store_pending_changes failed: {err}"),
        },
    }
}

/// Removes uploaded changes from the outbox.
#[flutter_rust_bridge::frb(sync)]
pub fn store_acknowledge_changes(seqs: Vec<i64>) -> StoreActionResponse {
    let result = with_store(|store| store.acknowledge_changes(&seqs))
        .and_then(|removed| removed.map_err(|err| err.to_string()));

    match result {
        Ok(removed) => StoreActionResponse::success(
            u32::try_from(removed).unwrap_or(u32::MAX),
            "Changes acknowledged.",
        ),
        Err(err) => {
            StoreActionResponse::failure(format!("store_acknowledge_changes failed: {err}"))
        }
    }
}

impl AttributeValueDto {
    fn into_core(self) -> Result<AttributeValue, String> {
        Ok(match self {
            Self::Text(text) => AttributeValue::Text(text),
            Self::Integer(number) => AttributeValue::Integer(number),
            Self::Real(number) => AttributeValue::Real(number),
            Self::Bool(flag) => AttributeValue::Bool(flag),
            Self::Uuid(text) => AttributeValue::Uuid(parse_object_id(&text)?),
            Self::Blob(bytes) => AttributeValue::Blob(bytes),
        })
    }

    fn from_core(value: AttributeValue) -> Self {
        match value {
            AttributeValue::Text(text) => Self::Text(text),
            AttributeValue::Integer(number) => Self::Integer(number),
            AttributeValue::Real(number) => Self::Real(number),
            AttributeValue::Bool(flag) => Self::Bool(flag),
            AttributeValue::Uuid(uuid) => Self::Uuid(uuid.to_string()),
            AttributeValue::Blob(bytes) => Self::Blob(bytes),
        }
    }
}

fn entries_into_core(
    entries: Vec<AttributeEntry>,
) -> Result<Vec<(String, AttributeValue)>, String> {
    entries
        .into_iter()
        .map(|entry| -> Result<(String, AttributeValue), String> {
            Ok((entry.name, entry.value.into_core()?))
        })
        .collect()
}

fn borrow_entries(values: &[(String, AttributeValue)]) -> Vec<(&str, AttributeValue)> {
    values
        .iter()
        .map(|(name, value)| (name.as_str(), value.clone()))
        .collect()
}

fn to_pending_change_item(change: PendingChange) -> PendingChangeItem {
    PendingChangeItem {
        seq: change.seq,
        entity: change.entity,
        record_id: change.record_id.to_string(),
        attribute: change.attribute,
        changed_at: change.changed_at,
    }
}

fn parse_object_id(raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw.trim()).map_err(|_| format!("invalid object id `{}`", raw.trim()))
}

fn resolve_store_path(db_path: Option<String>) -> PathBuf {
    let explicit = db_path
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty());
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }
    if let Ok(raw) = std::env::var(STORE_DB_PATH_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(STORE_DB_FILE_NAME)
}

fn lock_store() -> MutexGuard<'static, Option<PersistenceController>> {
    STORE.lock().unwrap_or_else(PoisonError::into_inner)
}

fn with_store<R>(f: impl FnOnce(&mut PersistenceController) -> R) -> Result<R, String> {
    let mut slot = lock_store();
    let store = slot
        .as_mut()
        .ok_or_else(|| "store not initialized; call init_store first".to_string())?;
    Ok(f(store))
}
