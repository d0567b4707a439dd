//! Declared entity schema.
//!
//! # Responsibility
//! - Map caller-facing entity/attribute names to SQL tables/columns.
//! - Record each attribute's kind and whether callers may write it.
//!
//! # Invariants
//! - Every entity declares `id` with kind `Uuid`.
//! - Table and column identifiers match `^[a-z][a-z0-9_]*$`.
//! - Entity names are unique in a schema; attribute names are unique per entity.
//!
//! The declared tables must agree with `db/migrations`; the
//! `schema_matches_migrated_tables` test guards that.

use crate::model::value::AttributeKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

/// Name of the identifying attribute every entity carries.
pub const ID_ATTRIBUTE: &str = "id";

static SQL_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("identifier regex must compile"));

/// Whether callers may write an attribute through update/create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeAccess {
    ReadWrite,
    /// Assigned at creation or maintained by the store.
    ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttributeSpec {
    /// Caller-facing name, e.g. `imageURL`.
    pub name: &'static str,
    /// SQL column backing this attribute.
    pub column: &'static str,
    pub kind: AttributeKind,
    pub access: AttributeAccess,
}

impl AttributeSpec {
    pub fn is_writable(&self) -> bool {
        self.access == AttributeAccess::ReadWrite
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntitySpec {
    pub name: &'static str,
    pub table: &'static str,
    /// Column refreshed with the commit time on every write, if any.
    pub touch_column: Option<&'static str>,
    pub attributes: &'static [AttributeSpec],
}

impl EntitySpec {
    /// Looks up one attribute by its exact caller-facing name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn id_column(&self) -> &'static str {
        self.attribute(ID_ATTRIBUTE)
            .map_or(ID_ATTRIBUTE, |attr| attr.column)
    }
}

/// Set of entities a store knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Schema {
    entities: &'static [EntitySpec],
}

const POST_ATTRIBUTES: &[AttributeSpec] = &[
    AttributeSpec {
        name: ID_ATTRIBUTE,
        column: "id",
        kind: AttributeKind::Uuid,
        access: AttributeAccess::ReadOnly,
    },
    AttributeSpec {
        name: "body",
        column: "body",
        kind: AttributeKind::Text,
        access: AttributeAccess::ReadWrite,
    },
    AttributeSpec {
        name: "imageURL",
        column: "image_url",
        kind: AttributeKind::Text,
        access: AttributeAccess::ReadWrite,
    },
    AttributeSpec {
        name: "isFavorite",
        column: "is_favorite",
        kind: AttributeKind::Bool,
        access: AttributeAccess::ReadWrite,
    },
    AttributeSpec {
        name: "createdAt",
        column: "created_at",
        kind: AttributeKind::Integer,
        access: AttributeAccess::ReadOnly,
    },
    AttributeSpec {
        name: "updatedAt",
        column: "updated_at",
        kind: AttributeKind::Integer,
        access: AttributeAccess::ReadOnly,
    },
];

const JAMLOG_ENTITIES: &[EntitySpec] = &[EntitySpec {
    name: "Post",
    table: "posts",
    touch_column: Some("updated_at"),
    attributes: POST_ATTRIBUTES,
}];

impl Schema {
    pub const fn new(entities: &'static [EntitySpec]) -> Self {
        Self { entities }
    }

    /// The schema backing the Jamlog app store.
    pub const fn jamlog() -> Self {
        Self::new(JAMLOG_ENTITIES)
    }

    /// Looks up one entity by its exact caller-facing name.
    pub fn entity(&self, name: &str) -> Option<&EntitySpec> {
        self.entities.iter().find(|entity| entity.name == name)
    }

    pub fn entities(&self) -> &'static [EntitySpec] {
        self.entities
    }

    /// Checks the structural invariants listed in the module docs.
    ///
    /// # Errors
    /// Returns a description of the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        let mut entity_names = HashSet::new();
        for entity in self.entities {
            if entity.name.trim().is_empty() {
                return Err("entity name cannot be empty".to_string());
            }
            if !entity_names.insert(entity.name) {
                return Err(format!("duplicate entity `{}`", entity.name));
            }
            check_identifier(entity.table)?;
            if let Some(column) = entity.touch_column {
                check_identifier(column)?;
            }

            let mut attribute_names = HashSet::new();
            for attr in entity.attributes {
                if attr.name.trim().is_empty() {
                    return Err(format!("entity `{}` has an unnamed attribute", entity.name));
                }
                if !attribute_names.insert(attr.name) {
                    return Err(format!(
                        "duplicate attribute `{}` on entity `{}`",
                        attr.name, entity.name
                    ));
                }
                check_identifier(attr.column)?;
            }

            match entity.attribute(ID_ATTRIBUTE) {
                Some(id) if id.kind == AttributeKind::Uuid => {}
                Some(id) => {
                    return Err(format!(
                        "entity `{}` declares `id` as {} instead of uuid",
                        entity.name, id.kind
                    ));
                }
                None => return Err(format!("entity `{}` has no `id` attribute", entity.name)),
            }
        }
        Ok(())
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::jamlog()
    }
}

fn check_identifier(identifier: &str) -> Result<(), String> {
    if SQL_IDENTIFIER.is_match(identifier) {
        Ok(())
    } else {
        Err(format!("`{identifier}` is not a valid SQL identifier"))
    }
}

#[cfg(test)]
mod tests {
    use super::{AttributeAccess, AttributeSpec, EntitySpec, Schema, ID_ATTRIBUTE};
    use crate::model::value::AttributeKind;

    const TEXT_ID: &[AttributeSpec] = &[AttributeSpec {
        name: ID_ATTRIBUTE,
        column: "id",
        kind: AttributeKind::Text,
        access: AttributeAccess::ReadOnly,
    }];

    const BAD_COLUMN: &[AttributeSpec] = &[
        AttributeSpec {
            name: ID_ATTRIBUTE,
            column: "id",
            kind: AttributeKind::Uuid,
            access: AttributeAccess::ReadOnly,
        },
        AttributeSpec {
            name: "body",
            column: "body; DROP TABLE posts",
            kind: AttributeKind::Text,
            access: AttributeAccess::ReadWrite,
        },
    ];

    #[test]
    fn jamlog_schema_is_valid() {
        Schema::jamlog().validate().unwrap();
    }

    #[test]
    fn lookups_are_exact_match() {
        let schema = Schema::jamlog();
        let post = schema.entity("Post").unwrap();
        assert_eq!(post.attribute("imageURL").unwrap().column, "image_url");
        assert!(post.attribute("imageurl").is_none());
        assert!(schema.entity("post").is_none());
        assert!(schema.entity("").is_none());
        assert_eq!(post.id_column(), "id");
    }

    #[test]
    fn validate_rejects_non_uuid_id() {
        const ENTITIES: &[EntitySpec] = &[EntitySpec {
            name: "Legacy",
            table: "legacy",
            touch_column: None,
            attributes: TEXT_ID,
        }];
        let err = Schema::new(ENTITIES).validate().unwrap_err();
        assert!(err.contains("instead of uuid"));
    }

    #[test]
    fn validate_rejects_unsafe_identifiers() {
        const ENTITIES: &[EntitySpec] = &[EntitySpec {
            name: "Post",
            table: "posts",
            touch_column: None,
            attributes: BAD_COLUMN,
        }];
        let err = Schema::new(ENTITIES).validate().unwrap_err();
        assert!(err.contains("not a valid SQL identifier"));
    }
}
