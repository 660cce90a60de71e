//! Value coercion between raw and canonical representations
//!
//! `marshal` is total over `Null` (null stays null for every type) and
//! strict otherwise: a raw value either coerces to the canonical form of
//! the requested type or the coercion fails. Canonical forms are what the
//! slot columns store and what hydrated records carry, so marshalling the
//! canonical form again is always the identity.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::errors::{MarshalError, MarshalResult};
use super::types::AttributeType;

/// Coerces a raw value to the canonical representation of `ty`.
///
/// Canonical forms:
/// - string/text: `Value::String`
/// - integer: `Value::Number` (i64)
/// - decimal: `Value::Number` (f64)
/// - boolean: `Value::Bool`
/// - date: `Value::String` in `YYYY-MM-DD`
/// - datetime: `Value::String` in RFC 3339, UTC
/// - uuid: `Value::String`, hyphenated lowercase
pub fn marshal(raw: &Value, ty: AttributeType) -> MarshalResult<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    match ty {
        AttributeType::String | AttributeType::Text => marshal_string(raw, ty),
        AttributeType::Integer => marshal_integer(raw),
        AttributeType::Decimal => marshal_decimal(raw),
        AttributeType::Boolean => marshal_boolean(raw),
        AttributeType::Date => marshal_date(raw),
        AttributeType::DateTime => marshal_datetime(raw),
        AttributeType::Uuid => marshal_uuid(raw),
    }
}

/// Renders a value for error messages: scalars verbatim, composites by kind
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}

fn marshal_string(raw: &Value, ty: AttributeType) -> MarshalResult<Value> {
    match raw {
        Value::String(s) => Ok(Value::String(s.clone())),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        _ => Err(MarshalError::coerce(ty.type_name(), raw)),
    }
}

fn marshal_integer(raw: &Value) -> MarshalResult<Value> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Value::from(i));
            }
            // Whole-valued floats coerce, fractional ones do not
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                    return Ok(Value::from(f as i64));
                }
            }
            Err(MarshalError::coerce("integer", raw))
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| MarshalError::coerce("integer", raw)),
        _ => Err(MarshalError::coerce("integer", raw)),
    }
}

fn marshal_decimal(raw: &Value) -> MarshalResult<Value> {
    match raw {
        Value::Number(n) => match n.as_f64() {
            Some(f) => Ok(Value::from(f)),
            None => Err(MarshalError::coerce("decimal", raw)),
        },
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::from(f)),
            _ => Err(MarshalError::coerce("decimal", raw)),
        },
        _ => Err(MarshalError::coerce("decimal", raw)),
    }
}

fn marshal_boolean(raw: &Value) -> MarshalResult<Value> {
    match raw {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(Value::Bool(false)),
            Some(1) => Ok(Value::Bool(true)),
            _ => Err(MarshalError::coerce("boolean", raw)),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(MarshalError::coerce("boolean", raw)),
        },
        _ => Err(MarshalError::coerce("boolean", raw)),
    }
}

fn marshal_date(raw: &Value) -> MarshalResult<Value> {
    let s = match raw {
        Value::String(s) => s.trim(),
        _ => return Err(MarshalError::coerce("date", raw)),
    };

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Value::String(date.format("%Y-%m-%d").to_string()));
    }
    // Datetime inputs normalize to their date part
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Value::String(dt.date_naive().format("%Y-%m-%d").to_string()));
    }
    Err(MarshalError::coerce("date", raw))
}

fn marshal_datetime(raw: &Value) -> MarshalResult<Value> {
    let s = match raw {
        Value::String(s) => s.trim(),
        _ => return Err(MarshalError::coerce("datetime", raw)),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        let utc = dt.with_timezone(&Utc);
        return Ok(Value::String(utc.to_rfc3339_opts(SecondsFormat::Secs, true)));
    }
    // Naive timestamps are taken as UTC
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        let utc = DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc);
        return Ok(Value::String(utc.to_rfc3339_opts(SecondsFormat::Secs, true)));
    }
    Err(MarshalError::coerce("datetime", raw))
}

fn marshal_uuid(raw: &Value) -> MarshalResult<Value> {
    let s = match raw {
        Value::String(s) => s.trim(),
        _ => return Err(MarshalError::coerce("uuid", raw)),
    };

    Uuid::parse_str(s)
        .map(|u| Value::String(u.hyphenated().to_string()))
        .map_err(|_| MarshalError::coerce("uuid", raw))
}
