//! Persistence accessor over the Jamlog store.
//!
//! # Responsibility
//! - Own one long-lived store connection for its whole lifetime.
//! - Offer generic get/set of one attribute addressed by
//!   `(entity, attribute, id)`, in explicit-result and best-effort forms.
//! - Queue committed local writes for cloud sync and merge remote ones.
//!
//! # Invariants
//! - Every write commits before the call returns; a failed write leaves the
//!   store untouched (record update and outbox entry share one transaction).
//! - Best-effort calls never surface errors: failures are logged and collapse
//!   to "no value" / "no effect".
//! - Log events carry entity/attribute/id metadata only, never values.
//!
//! # Concurrency
//! Reads take `&self`, writes `&mut self`. The controller is `Send` but not
//! `Sync`; share it across threads only behind a lock.

use crate::config::{StoreConfig, StoreLocation};
use crate::db::{open_db, open_db_in_memory, verify_schema_tables, DbError, DbResult};
use crate::model::schema::ID_ATTRIBUTE;
use crate::model::value::{AttributeValue, FromAttribute, IntoAttribute};
use crate::repo::attribute_repo::{
    AttributeRepository, SqliteAttributeRepository, StoreError, StoreResult, UpdateOutcome,
};
use crate::sync::outbox::{self, PendingChange, RecordMerge, RemoteChange};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use uuid::Uuid;

/// Explicitly constructed handle to one store.
pub struct PersistenceController {
    conn: Connection,
    config: StoreConfig,
}

impl PersistenceController {
    /// Opens the configured store and applies pending migrations.
    ///
    /// # Errors
    /// - `DbError::InvalidSchema` when the configured schema is malformed or
    ///   names tables/columns the migrations do not create.
    /// - Any open/bootstrap failure, including a newer on-disk schema.
    pub fn open(config: StoreConfig) -> DbResult<Self> {
        config.schema.validate().map_err(DbError::InvalidSchema)?;

        let conn = match &config.location {
            StoreLocation::File(path) => open_db(path)?,
            StoreLocation::InMemory => open_db_in_memory()?,
        };
        verify_schema_tables(&conn, &config.schema)?;

        info!(
            "event=store_ready module=store status=ok mode={} cloud_sync={}",
            config.mode_label(),
            config.cloud_sync
        );
        Ok(Self { conn, config })
    }

    /// Opens the configured store or stops the process.
    ///
    /// Nothing in the app works without a store, so an unopenable one
    /// (corruption, newer schema, disk failure) is fatal here.
    ///
    /// # Panics
    /// Panics when `open` fails.
    pub fn open_or_abort(config: StoreConfig) -> Self {
        let mode = config.mode_label();
        match Self::open(config) {
            Ok(controller) => controller,
            Err(err) => {
                error!("event=store_open module=store status=fatal mode={mode} error={err}");
                panic!("unresolved store error: {err}");
            }
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn repo(&self) -> SqliteAttributeRepository<'_> {
        SqliteAttributeRepository::new(&self.conn, self.config.schema)
    }

    /// Reads one attribute as `T`.
    ///
    /// Returns `Ok(None)` when the record does not exist or the attribute is
    /// unset.
    ///
    /// # Errors
    /// - `UnknownEntity` / `UnknownAttribute` for names outside the schema.
    /// - `TypeMismatch` when the stored value is not a `T`.
    /// - `Db` on query failure.
    pub fn try_fetch_attribute<T: FromAttribute>(
        &self,
        entity: &str,
        attribute: &str,
        id: Uuid,
    ) -> StoreResult<Option<T>> {
        let Some(value) = self.repo().fetch_attribute(entity, attribute, id)? else {
            return Ok(None);
        };

        T::from_attribute(value)
            .map(Some)
            .map_err(|stored| StoreError::TypeMismatch {
                entity: entity.to_string(),
                attribute: attribute.to_string(),
                expected: std::any::type_name::<T>().to_string(),
                found: stored.kind(),
            })
    }

    /// Best-effort read: any failure is logged and reported as `None`.
    ///
    /// Callers cannot tell a missing record, an unset attribute and an error
    /// apart; use `try_fetch_attribute` when that matters.
    pub fn fetch_attribute<T: FromAttribute>(
        &self,
        entity: &str,
        attribute: &str,
        id: Uuid,
    ) -> Option<T> {
        match self.try_fetch_attribute(entity, attribute, id) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "event=attribute_fetch module=store status=error entity={entity} attribute={attribute} id={id} error={err}"
                );
                None
            }
        }
    }

    /// Overwrites one attribute and commits.
    ///
    /// Returns `UpdateOutcome::NotFound` without touching the store when no
    /// record has `id`.
    ///
    /// # Errors
    /// - `UnknownEntity` / `UnknownAttribute` for names outside the schema.
    /// - `ReadOnlyAttribute` for `id` and store-maintained attributes.
    /// - `TypeMismatch` when `value` is not of the declared kind.
    /// - `Db` on statement or commit failure; nothing is persisted then.
    pub fn try_update_attribute<T: IntoAttribute>(
        &mut self,
        entity: &str,
        attribute: &str,
        value: T,
        id: Uuid,
    ) -> StoreResult<UpdateOutcome> {
        let value = value.into_attribute();
        let tx = self.conn.transaction()?;
        let outcome = SqliteAttributeRepository::new(&tx, self.config.schema)
            .update_attribute(entity, attribute, &value, id)?;
        if outcome == UpdateOutcome::Updated && self.config.cloud_sync {
            outbox::enqueue_change(&tx, entity, id, attribute)?;
        }
        tx.commit()?;

        debug!(
            "event=attribute_update module=store status=ok entity={entity} attribute={attribute} id={id} outcome={outcome:?}"
        );
        Ok(outcome)
    }

    /// Fire-and-forget write: a missing record is a no-op, failures are
    /// logged and swallowed.
    pub fn update_attribute<T: IntoAttribute>(
        &mut self,
        entity: &str,
        attribute: &str,
        value: T,
        id: Uuid,
    ) {
        if let Err(err) = self.try_update_attribute(entity, attribute, value, id) {
            error!(
                "event=attribute_update module=store status=error entity={entity} attribute={attribute} id={id} error={err}"
            );
        }
    }

    /// Inserts a new record with `id` and initial writable attributes.
    ///
    /// # Errors
    /// - `AlreadyExists` when a record with `id` is already stored.
    /// - Same name/access/kind errors as `try_update_attribute`.
    pub fn create_record(
        &mut self,
        entity: &str,
        id: Uuid,
        values: &[(&str, AttributeValue)],
    ) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        SqliteAttributeRepository::new(&tx, self.config.schema).create_record(entity, id, values)?;
        if self.config.cloud_sync {
            outbox::enqueue_change(&tx, entity, id, ID_ATTRIBUTE)?;
            for (attribute, _) in values {
                outbox::enqueue_change(&tx, entity, id, attribute)?;
            }
        }
        tx.commit()?;

        debug!("event=record_create module=store status=ok entity={entity} id={id}");
        Ok(())
    }

    pub fn record_exists(&self, entity: &str, id: Uuid) -> StoreResult<bool> {
        self.repo().record_exists(entity, id)
    }

    /// Lists local changes not yet acknowledged by a sync provider.
    pub fn pending_changes(&self, limit: Option<u32>) -> StoreResult<Vec<PendingChange>> {
        outbox::list_pending(&self.conn, limit)
    }

    /// Drops outbox entries a provider has pushed. Returns the removed count.
    pub fn acknowledge_changes(&mut self, seqs: &[i64]) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        let removed = outbox::acknowledge(&tx, seqs)?;
        tx.commit()?;
        Ok(removed)
    }

    /// Applies a change that arrived from another device.
    ///
    /// The change becomes visible to subsequent reads immediately and is not
    /// queued for re-upload. Changes to records this store does not have are
    /// no-ops (`UpdateOutcome::NotFound`).
    pub fn merge_remote_change(&mut self, change: &RemoteChange) -> StoreResult<UpdateOutcome> {
        let outcome = self.repo().update_attribute(
            &change.entity,
            &change.attribute,
            &change.value,
            change.record_id,
        )?;

        info!(
            "event=remote_merge module=store status=ok entity={} attribute={} id={} outcome={outcome:?}",
            change.entity, change.attribute, change.record_id
        );
        Ok(outcome)
    }

    /// Applies a record that was created on another device.
    ///
    /// Inserts the record with `values` when this store does not have it yet,
    /// otherwise overwrites the given attributes. Either way nothing is queued
    /// for re-upload, and a failure leaves the store untouched.
    pub fn merge_remote_record(
        &mut self,
        entity: &str,
        id: Uuid,
        values: &[(&str, AttributeValue)],
    ) -> StoreResult<RecordMerge> {
        let tx = self.conn.transaction()?;
        let repo = SqliteAttributeRepository::new(&tx, self.config.schema);
        let merged = if repo.record_exists(entity, id)? {
            for (attribute, value) in values {
                repo.update_attribute(entity, attribute, value, id)?;
            }
            RecordMerge::Updated
        } else {
            repo.create_record(entity, id, values)?;
            RecordMerge::Inserted
        };
        tx.commit()?;

        info!(
            "event=remote_merge module=store status=ok entity={entity} id={id} outcome={merged:?}"
        );
        Ok(merged)
    }
}
