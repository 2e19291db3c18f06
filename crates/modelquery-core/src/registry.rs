//! # Named Registries
//!
//! Named key/value registries, the store model registries are kept in
//! between requests.
//!
//! Registry names and keys are case-insensitive: both are trimmed and
//! lowercased before use.

use crate::primitives::MAX_REGISTRY_KEY_LENGTH;
use crate::{ModelRegistry, QueryError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A registry's entries in ascending key order.
pub type RegistryEntries = BTreeMap<String, Value>;

/// Storage of named key/value registries.
pub trait Registry {
    /// True when the registry exists, or when `key` exists in it.
    fn exists(&self, name: &str, key: Option<&str>) -> Result<bool, QueryError>;

    /// Create an empty registry. Creating an existing registry is a no-op.
    fn create_registry(&mut self, name: &str) -> Result<(), QueryError>;

    /// Read one entry.
    fn get(&self, name: &str, key: &str) -> Result<Option<Value>, QueryError>;

    /// Read every entry of a registry, or `None` if it does not exist.
    fn get_all(&self, name: &str) -> Result<Option<RegistryEntries>, QueryError>;

    /// Write one entry, creating the registry if needed.
    fn set(&mut self, name: &str, key: &str, value: Value) -> Result<(), QueryError>;

    /// Replace every entry of a registry, creating it if needed. Keys are
    /// normalized; entries not in `entries` are removed.
    fn replace(&mut self, name: &str, entries: RegistryEntries) -> Result<(), QueryError>;

    /// Names of every registry, ascending.
    fn names(&self) -> Result<Vec<String>, QueryError>;

    /// Entries of a registry as an ordered list.
    ///
    /// # Errors
    /// Returns `QueryError::Configuration` if the registry does not exist.
    fn sort(&self, name: &str) -> Result<Vec<(String, Value)>, QueryError> {
        let entries = self.get_all(name)?.ok_or_else(|| {
            QueryError::Configuration(format!("Registry not found: {}", name))
        })?;
        Ok(entries.into_iter().collect())
    }

    /// Store a model registry under `name`, one entry per top-level key.
    ///
    /// Whatever was stored under `name` before is replaced. Top-level keys
    /// fold to lowercase like every registry key, so `Table_Name` loads
    /// back as `table_name`.
    ///
    /// # Errors
    /// Returns `QueryError::Configuration` when two top-level keys fold to
    /// the same registry key.
    fn store_model(&mut self, name: &str, model: &ModelRegistry) -> Result<(), QueryError> {
        let value =
            serde_json::to_value(model).map_err(|e| QueryError::Serialization(e.to_string()))?;

        let mut entries = RegistryEntries::new();
        if let Value::Object(map) = value {
            for (key, inner) in map {
                let folded = normalize_key(&key)?;
                if entries.insert(folded, inner).is_some() {
                    return Err(QueryError::Configuration(format!(
                        "Registry {}: key {} collides with another key",
                        name, key
                    )));
                }
            }
        }
        self.replace(name, entries)
    }

    /// Rebuild a model registry stored with `store_model`.
    fn load_model(&self, name: &str) -> Result<Option<ModelRegistry>, QueryError> {
        let Some(entries) = self.get_all(name)? else {
            return Ok(None);
        };
        let map: Map<String, Value> = entries.into_iter().collect();
        serde_json::from_value(Value::Object(map))
            .map(Some)
            .map_err(|e| QueryError::Configuration(format!("Registry {}: {}", name, e)))
    }
}

/// Normalize a registry name or key.
///
/// # Errors
/// Returns `QueryError::Configuration` for empty or over-long input.
pub fn normalize_key(raw: &str) -> Result<String, QueryError> {
    let key = raw.trim().to_lowercase();
    if key.is_empty() {
        return Err(QueryError::Configuration(
            "Registry name or key must not be empty".to_string(),
        ));
    }
    if key.len() > MAX_REGISTRY_KEY_LENGTH {
        return Err(QueryError::Configuration(format!(
            "Registry name or key exceeds {} bytes",
            MAX_REGISTRY_KEY_LENGTH
        )));
    }
    Ok(key)
}

// =============================================================================
// IN-MEMORY REGISTRY
// =============================================================================

/// Registries held in memory for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    registries: BTreeMap<String, RegistryEntries>,
}

impl MemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Registry for MemoryRegistry {
    fn exists(&self, name: &str, key: Option<&str>) -> Result<bool, QueryError> {
        let Some(entries) = self.registries.get(&normalize_key(name)?) else {
            return Ok(false);
        };
        match key {
            None => Ok(true),
            Some(key) => Ok(entries.contains_key(&normalize_key(key)?)),
        }
    }

    fn create_registry(&mut self, name: &str) -> Result<(), QueryError> {
        self.registries.entry(normalize_key(name)?).or_default();
        Ok(())
    }

    fn get(&self, name: &str, key: &str) -> Result<Option<Value>, QueryError> {
        let key = normalize_key(key)?;
        Ok(self
            .registries
            .get(&normalize_key(name)?)
            .and_then(|entries| entries.get(&key))
            .cloned())
    }

    fn get_all(&self, name: &str) -> Result<Option<RegistryEntries>, QueryError> {
        Ok(self.registries.get(&normalize_key(name)?).cloned())
    }

    fn set(&mut self, name: &str, key: &str, value: Value) -> Result<(), QueryError> {
        let key = normalize_key(key)?;
        self.registries
            .entry(normalize_key(name)?)
            .or_default()
            .insert(key, value);
        Ok(())
    }

    fn replace(&mut self, name: &str, entries: RegistryEntries) -> Result<(), QueryError> {
        let mut normalized = RegistryEntries::new();
        for (key, value) in entries {
            normalized.insert(normalize_key(&key)?, value);
        }
        self.registries.insert(normalize_key(name)?, normalized);
        Ok(())
    }

    fn names(&self) -> Result<Vec<String>, QueryError> {
        Ok(self.registries.keys().cloned().collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
