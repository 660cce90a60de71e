//! Canonical virtual-column types
//!
//! Supported types:
//! - string: short UTF-8 string
//! - integer: 64-bit signed integer
//! - decimal: 64-bit floating point
//! - boolean: Boolean
//! - date: calendar date (canonical `YYYY-MM-DD`)
//! - datetime: instant (canonical RFC 3339, UTC)
//! - text: long UTF-8 string
//! - uuid: UUID (canonical hyphenated lowercase)
//!
//! Each canonical type owns exactly one storage slot column in the
//! `eav_values` table. Adding a type means adding a slot column, which is
//! a storage migration (see DESIGN.md).

use serde::{Deserialize, Serialize};

/// Canonical attribute types for virtual columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// Short UTF-8 string
    String,
    /// 64-bit signed integer
    Integer,
    /// 64-bit floating point
    Decimal,
    /// Boolean
    Boolean,
    /// Calendar date
    Date,
    /// Instant with timezone, normalized to UTC
    DateTime,
    /// Long UTF-8 string
    Text,
    /// UUID
    Uuid,
}

impl AttributeType {
    /// All canonical types, in slot-column order
    pub fn all() -> &'static [AttributeType] {
        &[
            AttributeType::String,
            AttributeType::Integer,
            AttributeType::Decimal,
            AttributeType::Boolean,
            AttributeType::Date,
            AttributeType::DateTime,
            AttributeType::Text,
            AttributeType::Uuid,
        ]
    }

    /// Returns the type name for error messages and metadata rows
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Integer => "integer",
            AttributeType::Decimal => "decimal",
            AttributeType::Boolean => "boolean",
            AttributeType::Date => "date",
            AttributeType::DateTime => "datetime",
            AttributeType::Text => "text",
            AttributeType::Uuid => "uuid",
        }
    }

    /// Returns the `eav_values` slot column holding values of this type
    pub fn slot(&self) -> &'static str {
        match self {
            AttributeType::String => "value_string",
            AttributeType::Integer => "value_integer",
            AttributeType::Decimal => "value_decimal",
            AttributeType::Boolean => "value_boolean",
            AttributeType::Date => "value_date",
            AttributeType::DateTime => "value_datetime",
            AttributeType::Text => "value_text",
            AttributeType::Uuid => "value_uuid",
        }
    }

    /// Normalizes a user-supplied type alias to a canonical type.
    ///
    /// Accepts the canonical names plus common storage-layer aliases
    /// (`varchar`, `int`, `bool`, `timestamp`, ...). Matching is
    /// case-insensitive. Returns `None` for unmappable aliases.
    pub fn from_alias(raw: &str) -> Option<AttributeType> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "string" | "varchar" | "char" => Some(AttributeType::String),
            "integer" | "int" | "bigint" | "smallint" => Some(AttributeType::Integer),
            "decimal" | "float" | "double" | "real" | "numeric" => Some(AttributeType::Decimal),
            "boolean" | "bool" => Some(AttributeType::Boolean),
            "date" => Some(AttributeType::Date),
            "datetime" | "timestamp" => Some(AttributeType::DateTime),
            "text" | "clob" | "longtext" => Some(AttributeType::Text),
            "uuid" | "guid" => Some(AttributeType::Uuid),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(AttributeType::String.type_name(), "string");
        assert_eq!(AttributeType::Integer.type_name(), "integer");
        assert_eq!(AttributeType::DateTime.type_name(), "datetime");
        assert_eq!(AttributeType::Uuid.type_name(), "uuid");
    }

    #[test]
    fn test_every_type_has_a_distinct_slot() {
        let mut slots: Vec<&str> = AttributeType::all().iter().map(|t| t.slot()).collect();
        slots.sort_unstable();
        slots.dedup();
        assert_eq!(slots.len(), AttributeType::all().len());
    }

    #[test]
    fn test_alias_normalization() {
        assert_eq!(AttributeType::from_alias("varchar"), Some(AttributeType::String));
        assert_eq!(AttributeType::from_alias("INT"), Some(AttributeType::Integer));
        assert_eq!(AttributeType::from_alias("bool"), Some(AttributeType::Boolean));
        assert_eq!(AttributeType::from_alias("timestamp"), Some(AttributeType::DateTime));
        assert_eq!(AttributeType::from_alias("guid"), Some(AttributeType::Uuid));
        assert_eq!(AttributeType::from_alias(" text "), Some(AttributeType::Text));
    }

    #[test]
    fn test_unknown_alias_rejected() {
        assert_eq!(AttributeType::from_alias("blob"), None);
        assert_eq!(AttributeType::from_alias(""), None);
        assert_eq!(AttributeType::from_alias("json"), None);
    }

    #[test]
    fn test_canonical_names_round_trip() {
        for ty in AttributeType::all() {
            assert_eq!(AttributeType::from_alias(ty.type_name()), Some(*ty));
        }
    }
}
