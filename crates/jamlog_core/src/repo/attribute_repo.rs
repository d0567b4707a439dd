//! Attribute repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Project one attribute of one record, or overwrite it in place.
//! - Create records with an initial set of attributes.
//!
//! # Invariants
//! - Table/column names are taken from `Schema`, caller names only select them.
//! - A missing record is an outcome (`None` / `UpdateOutcome::NotFound`),
//!   not an error.
//! - The entity's touch column is refreshed by every successful update.

use crate::db::{DbError, NOW_MS_SQL};
use crate::model::schema::{AttributeSpec, EntitySpec, Schema};
use crate::model::value::{AttributeKind, AttributeValue};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Error for attribute-level store operations.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    UnknownEntity(String),
    UnknownAttribute {
        entity: String,
        attribute: String,
    },
    ReadOnlyAttribute {
        entity: String,
        attribute: String,
    },
    TypeMismatch {
        entity: String,
        attribute: String,
        expected: String,
        found: AttributeKind,
    },
    AlreadyExists {
        entity: String,
        id: Uuid,
    },
    DuplicateAttribute {
        entity: String,
        attribute: String,
    },
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UnknownEntity(entity) => write!(f, "unknown entity `{entity}`"),
            Self::UnknownAttribute { entity, attribute } => {
                write!(f, "unknown attribute `{attribute}` on entity `{entity}`")
            }
            Self::ReadOnlyAttribute { entity, attribute } => {
                write!(f, "attribute `{attribute}` on entity `{entity}` is read-only")
            }
            Self::TypeMismatch {
                entity,
                attribute,
                expected,
                found,
            } => write!(
                f,
                "type mismatch for `{entity}.{attribute}`: expected {expected}, found {found}"
            ),
            Self::AlreadyExists { entity, id } => {
                write!(f, "`{entity}` record already exists: {id}")
            }
            Self::DuplicateAttribute { entity, attribute } => {
                write!(f, "attribute `{attribute}` given twice for entity `{entity}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Result of an attribute update against an existing-or-not record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
}

/// Repository interface for attribute-addressed access.
pub trait AttributeRepository {
    fn fetch_attribute(
        &self,
        entity: &str,
        attribute: &str,
        id: Uuid,
    ) -> StoreResult<Option<AttributeValue>>;
    fn update_attribute(
        &self,
        entity: &str,
        attribute: &str,
        value: &AttributeValue,
        id: Uuid,
    ) -> StoreResult<UpdateOutcome>;
    fn create_record(
        &self,
        entity: &str,
        id: Uuid,
        values: &[(&str, AttributeValue)],
    ) -> StoreResult<()>;
    fn record_exists(&self, entity: &str, id: Uuid) -> StoreResult<bool>;
}

/// SQLite-backed attribute repository.
///
/// Borrows a connection, so it works equally over a `Transaction`.
pub struct SqliteAttributeRepository<'conn> {
    conn: &'conn Connection,
    schema: Schema,
}

impl<'conn> SqliteAttributeRepository<'conn> {
    pub fn new(conn: &'conn Connection, schema: Schema) -> Self {
        Self { conn, schema }
    }

    fn entity(&self, entity: &str) -> StoreResult<&'static EntitySpec> {
        self.schema
            .entities()
            .iter()
            .find(|spec| spec.name == entity)
            .ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))
    }

    fn resolve(
        &self,
        entity: &str,
        attribute: &str,
    ) -> StoreResult<(&'static EntitySpec, &'static AttributeSpec)> {
        let spec = self.entity(entity)?;
        let attr = spec
            .attributes
            .iter()
            .find(|attr| attr.name == attribute)
            .ok_or_else(|| StoreError::UnknownAttribute {
                entity: entity.to_string(),
                attribute: attribute.to_string(),
            })?;
        Ok((spec, attr))
    }
}

impl AttributeRepository for SqliteAttributeRepository<'_> {
    fn fetch_attribute(
        &self,
        entity: &str,
        attribute: &str,
        id: Uuid,
    ) -> StoreResult<Option<AttributeValue>> {
        let (spec, attr) = self.resolve(entity, attribute)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} WHERE {} = ?1;",
            attr.column,
            spec.table,
            spec.id_column()
        ))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return decode_value(spec, attr, row.get::<_, Value>(0)?);
        }

        Ok(None)
    }

    fn update_attribute(
        &self,
        entity: &str,
        attribute: &str,
        value: &AttributeValue,
        id: Uuid,
    ) -> StoreResult<UpdateOutcome> {
        let (spec, attr) = self.resolve(entity, attribute)?;
        check_writable(spec, attr)?;
        check_kind(spec, attr, value)?;

        let touch = spec
            .touch_column
            .map(|column| format!(", {column} = {NOW_MS_SQL}"))
            .unwrap_or_default();
        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {} = ?1{touch} WHERE {} = ?2;",
                spec.table,
                attr.column,
                spec.id_column()
            ),
            params![to_sql_value(value), id.to_string()],
        )?;

        if changed == 0 {
            return Ok(UpdateOutcome::NotFound);
        }
        Ok(UpdateOutcome::Updated)
    }

    fn create_record(
        &self,
        entity: &str,
        id: Uuid,
        values: &[(&str, AttributeValue)],
    ) -> StoreResult<()> {
        let spec = self.entity(entity)?;
        if self.record_exists(entity, id)? {
            return Err(StoreError::AlreadyExists {
                entity: entity.to_string(),
                id,
            });
        }

        let mut seen = HashSet::new();
        let mut columns = vec![spec.id_column()];
        let mut bind_values = vec![Value::Text(id.to_string())];
        for (name, value) in values {
            let (_, attr) = self.resolve(entity, name)?;
            if !seen.insert(attr.name) {
                return Err(StoreError::DuplicateAttribute {
                    entity: spec.name.to_string(),
                    attribute: attr.name.to_string(),
                });
            }
            check_writable(spec, attr)?;
            check_kind(spec, attr, value)?;
            columns.push(attr.column);
            bind_values.push(to_sql_value(value));
        }

        let placeholders = (1..=bind_values.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        self.conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({placeholders});",
                spec.table,
                columns.join(", ")
            ),
            params_from_iter(bind_values),
        )?;

        Ok(())
    }

    fn record_exists(&self, entity: &str, id: Uuid) -> StoreResult<bool> {
        let spec = self.entity(entity)?;
        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1);",
                spec.table,
                spec.id_column()
            ),
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn check_writable(spec: &EntitySpec, attr: &AttributeSpec) -> StoreResult<()> {
    if attr.is_writable() {
        return Ok(());
    }
    Err(StoreError::ReadOnlyAttribute {
        entity: spec.name.to_string(),
        attribute: attr.name.to_string(),
    })
}

fn check_kind(spec: &EntitySpec, attr: &AttributeSpec, value: &AttributeValue) -> StoreResult<()> {
    if value.kind() == attr.kind {
        return Ok(());
    }
    Err(StoreError::TypeMismatch {
        entity: spec.name.to_string(),
        attribute: attr.name.to_string(),
        expected: attr.kind.to_string(),
        found: value.kind(),
    })
}

fn decode_value(
    spec: &EntitySpec,
    attr: &AttributeSpec,
    raw: Value,
) -> StoreResult<Option<AttributeValue>> {
    let value = match (attr.kind, raw) {
        (_, Value::Null) => return Ok(None),
        (AttributeKind::Text, Value::Text(text)) => AttributeValue::Text(text),
        (AttributeKind::Integer, Value::Integer(number)) => AttributeValue::Integer(number),
        (AttributeKind::Real, Value::Real(number)) => AttributeValue::Real(number),
        // REAL affinity may hand integral values back as integers.
        (AttributeKind::Real, Value::Integer(number)) => AttributeValue::Real(number as f64),
        (AttributeKind::Bool, Value::Integer(0)) => AttributeValue::Bool(false),
        (AttributeKind::Bool, Value::Integer(1)) => AttributeValue::Bool(true),
        (AttributeKind::Uuid, Value::Text(text)) => {
            let uuid = Uuid::parse_str(&text).map_err(|_| {
                StoreError::InvalidData(format!(
                    "malformed uuid in {}.{}",
                    spec.table, attr.column
                ))
            })?;
            AttributeValue::Uuid(uuid)
        }
        (AttributeKind::Blob, Value::Blob(bytes)) => AttributeValue::Blob(bytes),
        (kind, other) => {
            return Err(StoreError::InvalidData(format!(
                "{}.{} holds {} data but is declared {kind}",
                spec.table,
                attr.column,
                other.data_type()
            )));
        }
    };
    Ok(Some(value))
}

fn to_sql_value(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Text(text) => Value::Text(text.clone()),
        AttributeValue::Integer(number) => Value::Integer(*number),
        AttributeValue::Real(number) => Value::Real(*number),
        AttributeValue::Bool(flag) => Value::Integer(i64::from(*flag)),
        AttributeValue::Uuid(uuid) => Value::Text(uuid.to_string()),
        AttributeValue::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}
