//! # Persistence Format
//!
//! Binary serialization for stored registry values.
//!
//! Format: Header (5 bytes) + postcard-serialized `StoredValue`.
//! - 4 bytes: Magic ("MQRV")
//! - 1 byte: Version
//!
//! JSON values are mirrored into `StoredValue` first because postcard is
//! not self-describing. Object members are stored in ascending key order.
//!
//! Size and header are validated before the payload is decoded.

use crate::{QueryError, primitives};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Minimum valid encoding size (header only).
const HEADER_SIZE: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The header preceding every stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Create a header with the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), QueryError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(QueryError::Serialization("Invalid magic bytes".to_string()));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(QueryError::Serialization(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, QueryError> {
        if bytes.len() < HEADER_SIZE {
            return Err(QueryError::Serialization("Header too short".to_string()));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// STORED VALUE
// =============================================================================

/// Postcard-friendly mirror of a JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredValue {
    Null,
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
    List(Vec<StoredValue>),
    Map(Vec<(String, StoredValue)>),
}

impl From<&Value> for StoredValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(*flag),
            Value::Number(number) => {
                if let Some(i) = number.as_i64() {
                    Self::Integer(i)
                } else if let Some(u) = number.as_u64() {
                    Self::Unsigned(u)
                } else {
                    number.as_f64().map(Self::Float).unwrap_or(Self::Null)
                }
            }
            Value::String(text) => Self::Text(text.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from).collect()),
            Value::Object(map) => {
                let mut entries: Vec<(String, StoredValue)> = map
                    .iter()
                    .map(|(key, inner)| (key.clone(), Self::from(inner)))
                    .collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                Self::Map(entries)
            }
        }
    }
}

impl From<StoredValue> for Value {
    fn from(stored: StoredValue) -> Self {
        match stored {
            StoredValue::Null => Value::Null,
            StoredValue::Bool(flag) => Value::Bool(flag),
            StoredValue::Integer(i) => Value::from(i),
            StoredValue::Unsigned(u) => Value::from(u),
            StoredValue::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            StoredValue::Text(text) => Value::String(text),
            StoredValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            StoredValue::Map(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(key, inner)| (key, Value::from(inner)))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a value to bytes (header + payload).
///
/// This is a pure transformation - no I/O.
pub fn value_to_bytes(value: &Value) -> Result<Vec<u8>, QueryError> {
    let header = PersistenceHeader::new();
    let payload = postcard::to_stdvec(&StoredValue::from(value))
        .map_err(|e| QueryError::Serialization(e.to_string()))?;

    if payload.len() + HEADER_SIZE > primitives::MAX_STORED_VALUE_SIZE {
        return Err(QueryError::Serialization(format!(
            "Value size {} bytes exceeds maximum allowed {} bytes",
            payload.len() + HEADER_SIZE,
            primitives::MAX_STORED_VALUE_SIZE
        )));
    }

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a value from bytes.
///
/// Validates size and header before decoding the payload.
pub fn value_from_bytes(bytes: &[u8]) -> Result<Value, QueryError> {
    if bytes.len() < HEADER_SIZE {
        return Err(QueryError::Serialization(
            "Data too short: minimum 5 bytes required".to_string(),
        ));
    }
    if bytes.len() > primitives::MAX_STORED_VALUE_SIZE {
        return Err(QueryError::Serialization(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            primitives::MAX_STORED_VALUE_SIZE
        )));
    }

    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    let stored: StoredValue = postcard::from_bytes(&bytes[HEADER_SIZE..]).map_err(|e| {
        QueryError::Serialization(format!("Failed to decode stored value: {}", e))
    })?;

    Ok(Value::from(stored))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_roundtrip() {
        let header = PersistenceHeader::new();
        let restored = PersistenceHeader::from_bytes(&header.to_bytes()).expect("parse header");
        assert_eq!(restored, header);
    }

    #[test]
    fn encoding_is_order_independent() {
        let a = json!({"b": 1, "a": [true, null, 1.5, "x"]});
        let b = json!({"a": [true, null, 1.5, "x"], "b": 1});

        let bytes_a = value_to_bytes(&a).expect("encode");
        let bytes_b = value_to_bytes(&b).expect("encode");
        assert_eq!(bytes_a, bytes_b);

        let decoded = value_from_bytes(&bytes_a).expect("decode");
        assert_eq!(decoded, a);
    }

    #[test]
    fn large_unsigned_survives() {
        let value = json!(u64::MAX);
        let decoded = value_from_bytes(&value_to_bytes(&value).expect("encode")).expect("decode");
        assert_eq!(decoded, value);
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = vec![0u8; 10];
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(matches!(value_from_bytes(&bytes), Err(QueryError::Serialization(_))));
    }

    #[test]
    fn truncated_data_rejected() {
        assert!(value_from_bytes(b"MQ").is_err());
    }
}
