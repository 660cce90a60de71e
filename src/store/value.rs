//! Attribute value rows
//!
//! One `AttributeValue` stores one virtual-column value for one entity:
//!
//! ```text
//! eav_values(id PK, attribute_id FK, entity_id,
//!            value_string NULL, value_integer NULL, value_decimal NULL,
//!            value_boolean NULL, value_date NULL, value_datetime NULL,
//!            value_text NULL, value_uuid NULL)
//! ```
//!
//! Exactly one slot is populated: the one matching the attribute's
//! canonical type. At most one row exists per (attribute_id, entity_id).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::backend::{Row, TableSchema};
use crate::marshal::AttributeType;

use super::errors::{StoreError, StoreResult};

/// Name of the value table
pub const EAV_VALUES_TABLE: &str = "eav_values";

/// Physical schema of the value table
pub fn values_table_schema() -> TableSchema {
    let mut columns = vec!["id".to_string(), "attribute_id".to_string(), "entity_id".to_string()];
    columns.extend(AttributeType::all().iter().map(|t| t.slot().to_string()));
    TableSchema::new(EAV_VALUES_TABLE, columns, vec!["id".into()])
}

/// One stored value for one (attribute, entity) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    /// Unique row id
    pub id: Uuid,
    /// Owning attribute definition
    pub attribute_id: Uuid,
    /// Owning entity (primary-key values joined with `:`)
    pub entity_id: String,
    /// Slot for string values
    pub value_string: Option<String>,
    /// Slot for integer values
    pub value_integer: Option<i64>,
    /// Slot for decimal values
    pub value_decimal: Option<f64>,
    /// Slot for boolean values
    pub value_boolean: Option<bool>,
    /// Slot for date values
    pub value_date: Option<NaiveDate>,
    /// Slot for datetime values
    pub value_datetime: Option<DateTime<Utc>>,
    /// Slot for long text values
    pub value_text: Option<String>,
    /// Slot for uuid values
    pub value_uuid: Option<Uuid>,
}

impl AttributeValue {
    /// Creates an empty value row for (attribute, entity)
    pub fn new(attribute_id: Uuid, entity_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            attribute_id,
            entity_id: entity_id.into(),
            value_string: None,
            value_integer: None,
            value_decimal: None,
            value_boolean: None,
            value_date: None,
            value_datetime: None,
            value_text: None,
            value_uuid: None,
        }
    }

    /// Clears every slot
    fn clear_slots(&mut self) {
        self.value_string = None;
        self.value_integer = None;
        self.value_decimal = None;
        self.value_boolean = None;
        self.value_date = None;
        self.value_datetime = None;
        self.value_text = None;
        self.value_uuid = None;
    }

    /// Writes a canonical value into the slot matching `ty`, clearing
    /// the others. Null clears every slot.
    ///
    /// Expects the canonical forms produced by `marshal::marshal`; a
    /// non-canonical value is a malformed-row error.
    pub fn set_typed(&mut self, ty: AttributeType, canonical: &Value) -> StoreResult<()> {
        self.clear_slots();
        if canonical.is_null() {
            return Ok(());
        }

        let malformed = || {
            StoreError::MalformedRow(format!(
                "value {} is not canonical for type {}",
                canonical,
                ty.type_name()
            ))
        };

        match ty {
            AttributeType::String => {
                self.value_string = Some(canonical.as_str().ok_or_else(malformed)?.to_string());
            }
            AttributeType::Integer => {
                self.value_integer = Some(canonical.as_i64().ok_or_else(malformed)?);
            }
            AttributeType::Decimal => {
                self.value_decimal = Some(canonical.as_f64().ok_or_else(malformed)?);
            }
            AttributeType::Boolean => {
                self.value_boolean = Some(canonical.as_bool().ok_or_else(malformed)?);
            }
            AttributeType::Date => {
                let s = canonical.as_str().ok_or_else(malformed)?;
                self.value_date =
                    Some(NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| malformed())?);
            }
            AttributeType::DateTime => {
                let s = canonical.as_str().ok_or_else(malformed)?;
                self.value_datetime = Some(
                    DateTime::parse_from_rfc3339(s)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|_| malformed())?,
                );
            }
            AttributeType::Text => {
                self.value_text = Some(canonical.as_str().ok_or_else(malformed)?.to_string());
            }
            AttributeType::Uuid => {
                let s = canonical.as_str().ok_or_else(malformed)?;
                self.value_uuid = Some(Uuid::parse_str(s).map_err(|_| malformed())?);
            }
        }
        Ok(())
    }

    /// Reads the slot matching `ty` as a canonical value; Null when the
    /// slot is empty
    pub fn get_typed(&self, ty: AttributeType) -> Value {
        match ty {
            AttributeType::String => self.value_string.as_deref().map(Value::from),
            AttributeType::Integer => self.value_integer.map(Value::from),
            AttributeType::Decimal => self.value_decimal.map(Value::from),
            AttributeType::Boolean => self.value_boolean.map(Value::from),
            AttributeType::Date => self
                .value_date
                .map(|d| Value::from(d.format("%Y-%m-%d").to_string())),
            AttributeType::DateTime => self.value_datetime.map(|dt| {
                Value::from(dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            }),
            AttributeType::Text => self.value_text.as_deref().map(Value::from),
            AttributeType::Uuid => self.value_uuid.map(|u| Value::from(u.hyphenated().to_string())),
        }
        .unwrap_or(Value::Null)
    }

    /// Converts the value to a value-table row
    pub fn to_row(&self) -> Row {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // A struct with named fields always serializes to an object
            _ => Row::new(),
        }
    }

    /// Decodes a value-table row
    pub fn from_row(row: &Row) -> StoreResult<Self> {
        serde_json::from_value(Value::Object(row.clone()))
            .map_err(|e| StoreError::MalformedRow(e.to_string()))
    }
}
