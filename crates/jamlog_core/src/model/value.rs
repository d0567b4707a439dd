//! Typed attribute values.
//!
//! `AttributeValue` is the dynamic carrier used at the storage boundary;
//! `FromAttribute`/`IntoAttribute` convert it to and from plain Rust types so
//! callers name the type they expect and mismatches surface as errors.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Storage kind of one declared attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Text,
    Integer,
    Real,
    Bool,
    Uuid,
    Blob,
}

impl AttributeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Bool => "bool",
            Self::Uuid => "uuid",
            Self::Blob => "blob",
        }
    }
}

impl Display for AttributeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One non-null attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Uuid(Uuid),
    Blob(Vec<u8>),
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Text(_) => AttributeKind::Text,
            Self::Integer(_) => AttributeKind::Integer,
            Self::Real(_) => AttributeKind::Real,
            Self::Bool(_) => AttributeKind::Bool,
            Self::Uuid(_) => AttributeKind::Uuid,
            Self::Blob(_) => AttributeKind::Blob,
        }
    }
}

/// Conversion from a stored value into the caller's expected type.
///
/// On mismatch the original value is handed back so the caller can report
/// what was actually stored.
pub trait FromAttribute: Sized {
    fn from_attribute(value: AttributeValue) -> Result<Self, AttributeValue>;
}

/// Conversion from a caller value into a storable value.
pub trait IntoAttribute {
    fn into_attribute(self) -> AttributeValue;
}

macro_rules! attribute_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromAttribute for $ty {
                fn from_attribute(value: AttributeValue) -> Result<Self, AttributeValue> {
                    match value {
                        AttributeValue::$variant(inner) => Ok(inner),
                        other => Err(other),
                    }
                }
            }

            impl IntoAttribute for $ty {
                fn into_attribute(self) -> AttributeValue {
                    AttributeValue::$variant(self)
                }
            }
        )*
    };
}

attribute_conversions! {
    String => Text,
    i64 => Integer,
    f64 => Real,
    bool => Bool,
    Uuid => Uuid,
    Vec<u8> => Blob,
}

impl FromAttribute for AttributeValue {
    fn from_attribute(value: AttributeValue) -> Result<Self, AttributeValue> {
        Ok(value)
    }
}

impl IntoAttribute for AttributeValue {
    fn into_attribute(self) -> AttributeValue {
        self
    }
}

impl IntoAttribute for &str {
    fn into_attribute(self) -> AttributeValue {
        AttributeValue::Text(self.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{AttributeKind, AttributeValue, FromAttribute, IntoAttribute};

    #[test]
    fn from_attribute_hands_back_mismatched_value() {
        let stored = AttributeValue::Text("draft".to_string());
        let err = i64::from_attribute(stored.clone()).unwrap_err();
        assert_eq!(err, stored);
        assert_eq!(err.kind(), AttributeKind::Text);
    }

    #[test]
    fn str_converts_to_owned_text() {
        assert_eq!(
            "final".into_attribute(),
            AttributeValue::Text("final".to_string())
        );
        assert_eq!(
            String::from_attribute("final".into_attribute()).unwrap(),
            "final"
        );
    }

    #[test]
    fn dynamic_value_passes_through_unchanged() {
        let value = AttributeValue::Bool(true);
        assert_eq!(
            AttributeValue::from_attribute(value.clone()).unwrap(),
            value
        );
    }
}
