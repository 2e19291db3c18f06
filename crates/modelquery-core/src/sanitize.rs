//! # Field Sanitizers
//!
//! Type-keyed cleansing applied to every resolved field value.
//!
//! The field processor hands each `ResolvedField` to a `FieldSanitizer`
//! and stores whatever comes back. Two sanitizers ship with the core:
//! - `PassthroughSanitizer`: returns the value untouched
//! - `TypeSanitizer`: coerces the value to its declared data type

use crate::types::{integer_value, is_truthy, sort_value, text_value};
use crate::QueryError;
use serde_json::{Number, Value};

/// A field after default, value and type resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    /// Field name.
    pub name: String,
    /// Effective value: the record's value, else the default, else null.
    pub value: Value,
    /// Effective data type: the declared type, else `"string"`.
    pub data_type: String,
}

/// Applies type-based cleansing to a resolved field.
pub trait FieldSanitizer {
    /// Return the sanitized value for `field`.
    fn sanitize(&self, field: &ResolvedField) -> Result<Value, QueryError>;
}

/// Returns every value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughSanitizer;

impl FieldSanitizer for PassthroughSanitizer {
    fn sanitize(&self, field: &ResolvedField) -> Result<Value, QueryError> {
        Ok(field.value.clone())
    }
}

/// Coerces values to their declared data type.
///
/// | type                                   | result                                   |
/// |----------------------------------------|------------------------------------------|
/// | `integer`, `int`                       | integer reading of the value             |
/// | `boolean`, `bool`                      | truthiness of the value                  |
/// | `float`, `decimal`, `number`           | JSON number, null when unparsable        |
/// | `json`, `object`, `array`              | decoded JSON with sorted keys            |
/// | `string` and everything else textual   | trimmed text without control characters |
///
/// Null stays null for every type.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeSanitizer;

impl TypeSanitizer {
    fn to_float(value: &Value) -> Value {
        match value {
            Value::Number(_) => value.clone(),
            Value::String(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Value::Bool(flag) => Value::from(i64::from(*flag)),
            _ => Value::Null,
        }
    }

    fn to_json(value: &Value) -> Value {
        match value {
            Value::String(text) => serde_json::from_str::<Value>(text)
                .map(sort_value)
                .unwrap_or_else(|_| Value::String(text.clone())),
            other => sort_value(other.clone()),
        }
    }

    fn to_text(value: &Value) -> Value {
        let text: String = text_value(value)
            .chars()
            .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
            .collect();
        Value::String(text.trim().to_string())
    }
}

impl FieldSanitizer for TypeSanitizer {
    fn sanitize(&self, field: &ResolvedField) -> Result<Value, QueryError> {
        if field.value.is_null() {
            return Ok(Value::Null);
        }

        let sanitized = match field.data_type.to_ascii_lowercase().as_str() {
            "integer" | "int" => Value::from(integer_value(&field.value)),
            "boolean" | "bool" => Value::Bool(is_truthy(&field.value)),
            "float" | "decimal" | "number" => Self::to_float(&field.value),
            "json" | "object" | "array" => Self::to_json(&field.value),
            _ => Self::to_text(&field.value),
        };

        Ok(sanitized)
    }
}

// =============================================================================
// TESTS
// =============================================================================
