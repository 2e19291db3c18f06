//! # Core Type Definitions
//!
//! This module contains the shared types of the modelquery core:
//! - Model description (`FieldDefinition`, `FieldSet`, `ModelRegistry`)
//! - Row data (`Record`) and shaped output (`ResultObject`, `ResultValue`)
//! - Operation selection (`CrudType`) and execution output (`QueryOutput`)
//! - Error types (`QueryError`)
//! - Lenient value coercion helpers shared by sanitizers and criteria
//!
//! ## Determinism Guarantees
//!
//! Every mapping produced here is a `BTreeMap` or is rebuilt in ascending
//! key order, so serialized output is byte-identical for identical input.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// RECORDS
// =============================================================================

/// One row returned by query execution.
///
/// Records are produced by the external query object and consumed
/// transiently by the field processor.
pub type Record = Map<String, Value>;

// =============================================================================
// FIELD DEFINITIONS
// =============================================================================

/// Definition of a single field in a model registry.
///
/// Every member is optional on the wire so that an empty entry (`{}`)
/// still loads; the field processor rejects it when it is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Column / attribute name the field reads from a record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Declared data type. Absent means `"string"`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,

    /// Value used when the record holds nothing for this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldDefinition {
    /// Create a definition with a name and a data type.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            data_type: Some(data_type.into()),
            default: None,
        }
    }

    /// Attach a default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// The field name, if the definition carries a non-empty one.
    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// True when the definition is structurally unusable.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        self.field_name().is_none()
    }
}

/// Field definitions keyed by their registry key.
pub type FieldSet = BTreeMap<String, FieldDefinition>;

// =============================================================================
// MODEL REGISTRY
// =============================================================================

/// Configuration describing one data model.
///
/// Holds the field definitions, the ordered custom field group names, the
/// field set of each group, and every other registry setting (standard
/// criteria, controller flags, `primary_prefix`, ...) as a flat map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRegistry {
    /// Regular field definitions.
    #[serde(default)]
    pub fields: FieldSet,

    /// Custom field group names, in processing order.
    #[serde(default)]
    pub customfieldgroups: Vec<String>,

    /// Field definitions of each custom field group, keyed by group name.
    #[serde(default)]
    pub groups: BTreeMap<String, FieldSet>,

    /// All remaining settings.
    #[serde(flatten)]
    pub settings: BTreeMap<String, Value>,
}

impl ModelRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a regular field keyed by its own name.
    #[must_use]
    pub fn with_field(mut self, definition: FieldDefinition) -> Self {
        let key = definition.name.clone().unwrap_or_default();
        self.fields.insert(key, definition);
        self
    }

    /// Declare a custom field group together with its field set.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>, fields: FieldSet) -> Self {
        let group = group.into();
        if !self.customfieldgroups.contains(&group) {
            self.customfieldgroups.push(group.clone());
        }
        self.groups.insert(group, fields);
        self
    }

    /// Set a registry value, builder style.
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Get a setting. Null values count as unset.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.get(key).filter(|value| !value.is_null())
    }

    /// Get a setting, falling back to `default` when it is unset.
    #[must_use]
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).cloned().unwrap_or(default)
    }

    /// Store a setting.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.settings.insert(key.into(), value.into());
    }

    /// Read a setting as an on/off flag.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_truthy)
    }

    /// True when the model's field set contains the named column.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
            || self
                .fields
                .values()
                .any(|definition| definition.field_name() == Some(name))
    }

    /// Field definitions of a custom field group.
    #[must_use]
    pub fn group_fields(&self, group: &str) -> Option<&FieldSet> {
        self.groups.get(group)
    }
}

// =============================================================================
// RESULT OBJECT
// =============================================================================

/// A shaped row: field name to value, always in ascending key order.
///
/// Custom field groups appear as nested objects alongside regular fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultObject(BTreeMap<String, ResultValue>);

/// A single entry of a `ResultObject`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultValue {
    /// A sanitized field value. Nested JSON objects are key-sorted.
    Scalar(Value),
    /// A shaped custom field group.
    Group(ResultObject),
}

impl ResultObject {
    /// Create an empty result object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, name: impl Into<String>, value: ResultValue) {
        self.0.insert(name.into(), value);
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResultValue> {
        self.0.get(name)
    }

    /// Look up a scalar entry.
    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<&Value> {
        match self.0.get(name) {
            Some(ResultValue::Scalar(value)) => Some(value),
            _ => None,
        }
    }

    /// Look up a nested group.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&ResultObject> {
        match self.0.get(name) {
            Some(ResultValue::Group(group)) => Some(group),
            _ => None,
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the object holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entry names in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResultValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Convert to a JSON value whose objects keep ascending key order.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.0.len());
        for (name, value) in self.iter() {
            let json = match value {
                ResultValue::Scalar(scalar) => scalar.clone(),
                ResultValue::Group(group) => group.to_json(),
            };
            map.insert(name.to_string(), json);
        }
        Value::Object(map)
    }
}

// =============================================================================
// CRUD TYPE
// =============================================================================

/// The operation requested from a query object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum CrudType {
    Create,
    #[default]
    Read,
    Update,
    Delete,
}

impl CrudType {
    /// Parse a CRUD type case-insensitively.
    ///
    /// Unrecognized input yields `Read`.
    #[must_use]
    pub fn parse_lenient(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "create" => Self::Create,
            "update" => Self::Update,
            "delete" => Self::Delete,
            _ => Self::Read,
        }
    }

    /// Canonical capitalised name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Read => "Read",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

impl fmt::Display for CrudType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// QUERY OUTPUT
// =============================================================================

/// What a query object returns after execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum QueryOutput {
    /// Rows from a read (`item`, `list` and `distinct` query objects).
    Rows(Vec<Record>),
    /// A single value from a `result` read.
    Value(Value),
    /// Number of rows touched by an update or delete.
    Affected(u64),
    /// Identifier generated by an insert.
    InsertId(u64),
}

impl QueryOutput {
    /// Rows of a read, empty for every other output.
    #[must_use]
    pub fn rows(&self) -> &[Record] {
        match self {
            Self::Rows(rows) => rows,
            _ => &[],
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the modelquery core.
///
/// `Configuration` and `Runtime` are the two kinds raised by field shaping
/// and query control. `Storage` and `Serialization` come from the registry
/// store and its codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A model registry is structurally unusable. Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A collaborator failed. The original message is kept verbatim.
    #[error("{0}")]
    Runtime(String),

    /// The registry store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl QueryError {
    /// Re-raise any error as a runtime error carrying the inner message
    /// without its kind prefix.
    #[must_use]
    pub fn into_runtime(self) -> Self {
        match self {
            Self::Configuration(message)
            | Self::Runtime(message)
            | Self::Storage(message)
            | Self::Serialization(message) => Self::Runtime(message),
        }
    }
}

// =============================================================================
// VALUE COERCION
// =============================================================================

/// Integer reading of a string: optional sign plus leading digits.
///
/// `"12abc"` reads as 12, `"1,2"` as 1, `"abc"` and `""` as 0.
/// Out-of-range digit runs saturate.
#[must_use]
pub fn leading_integer(input: &str) -> i64 {
    let trimmed = input.trim_start();
    let bytes = trimmed.as_bytes();
    let (negative, start) = match bytes.first() {
        Some(b'-') => (true, 1),
        Some(b'+') => (false, 1),
        _ => (false, 0),
    };

    let mut acc: i64 = 0;
    for byte in &bytes[start..] {
        if !byte.is_ascii_digit() {
            break;
        }
        acc = acc
            .saturating_mul(10)
            .saturating_add(i64::from(byte - b'0'));
    }

    if negative { acc.saturating_neg() } else { acc }
}

/// Integer reading of any JSON value.
///
/// Null reads as 0, booleans as 0/1, floats truncate, strings use
/// `leading_integer`, arrays and objects read as 0 when empty and 1 otherwise.
#[must_use]
pub fn integer_value(value: &Value) -> i64 {
    match value {
        Value::Null => 0,
        Value::Bool(flag) => i64::from(*flag),
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_u64().map(|n| i64::try_from(n).unwrap_or(i64::MAX)))
            .or_else(|| number.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(text) => leading_integer(text),
        Value::Array(items) => i64::from(!items.is_empty()),
        Value::Object(map) => i64::from(!map.is_empty()),
    }
}

/// String reading of a JSON scalar.
///
/// Null reads as `""`, booleans as `"1"`/`""`, numbers in decimal form.
/// Arrays and objects read as their compact JSON text.
#[must_use]
pub fn text_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Truthiness of a JSON value: `""`, `"0"`, 0, false, null and empty
/// containers are false.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !(text.is_empty() || text == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Rebuild a JSON value with every nested object in ascending key order.
///
/// Pure: the input is consumed and a new value is returned.
#[must_use]
pub fn sort_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(key, inner)| (key, sort_value(inner)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_value).collect()),
        scalar => scalar,
    }
}

// =============================================================================
// TESTS
// =============================================================================
