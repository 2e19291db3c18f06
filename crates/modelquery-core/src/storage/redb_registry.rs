//! # redb-backed Registry Storage
//!
//! A disk-backed `Registry` using the redb embedded database.
//!
//! Every write is its own ACID transaction, so registries written by one
//! process are visible to the next one that opens the same file.

use crate::formats::{value_from_bytes, value_to_bytes};
use crate::registry::{Registry, RegistryEntries, normalize_key};
use crate::QueryError;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde_json::Value;
use std::path::Path;

/// Table of registry names: name -> entry count
const REGISTRIES: TableDefinition<&str, u64> = TableDefinition::new("registries");

/// Table of entries: (registry, key) -> serialized value bytes
const ENTRIES: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("entries");

fn storage_error(e: impl std::fmt::Display) -> QueryError {
    QueryError::Storage(e.to_string())
}

/// A disk-backed registry store.
pub struct RedbRegistry {
    db: Database,
}

impl std::fmt::Debug for RedbRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbRegistry").finish_non_exhaustive()
    }
}

impl RedbRegistry {
    /// Open or create a registry database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, QueryError> {
        let db = Database::create(path.as_ref()).map_err(storage_error)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(storage_error)?;
            let _ = write_txn.open_table(REGISTRIES).map_err(storage_error)?;
            let _ = write_txn.open_table(ENTRIES).map_err(storage_error)?;
            write_txn.commit().map_err(storage_error)?;
        }

        tracing::debug!(path = %path.as_ref().display(), "registry database opened");
        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), QueryError> {
        self.db.compact().map_err(storage_error)?;
        Ok(())
    }

    fn read_entries(&self, name: &str) -> Result<RegistryEntries, QueryError> {
        let read_txn = self.db.begin_read().map_err(storage_error)?;
        let table = read_txn.open_table(ENTRIES).map_err(storage_error)?;

        let mut entries = RegistryEntries::new();
        for entry in table.range((name, "")..).map_err(storage_error)? {
            let (key, bytes) = entry.map_err(storage_error)?;
            let (registry, entry_key) = key.value();
            if registry != name {
                break;
            }
            entries.insert(entry_key.to_string(), value_from_bytes(bytes.value())?);
        }
        Ok(entries)
    }
}

impl Registry for RedbRegistry {
    fn exists(&self, name: &str, key: Option<&str>) -> Result<bool, QueryError> {
        let name = normalize_key(name)?;
        let read_txn = self.db.begin_read().map_err(storage_error)?;

        let registries = read_txn.open_table(REGISTRIES).map_err(storage_error)?;
        if registries.get(name.as_str()).map_err(storage_error)?.is_none() {
            return Ok(false);
        }

        match key {
            None => Ok(true),
            Some(key) => {
                let key = normalize_key(key)?;
                let entries = read_txn.open_table(ENTRIES).map_err(storage_error)?;
                Ok(entries
                    .get((name.as_str(), key.as_str()))
                    .map_err(storage_error)?
                    .is_some())
            }
        }
    }

    fn create_registry(&mut self, name: &str) -> Result<(), QueryError> {
        let name = normalize_key(name)?;
        let write_txn = self.db.begin_write().map_err(storage_error)?;
        {
            let mut registries = write_txn.open_table(REGISTRIES).map_err(storage_error)?;
            let present = registries
                .get(name.as_str())
                .map_err(storage_error)?
                .is_some();
            if !present {
                registries.insert(name.as_str(), 0).map_err(storage_error)?;
            }
        }
        write_txn.commit().map_err(storage_error)?;
        Ok(())
    }

    fn get(&self, name: &str, key: &str) -> Result<Option<Value>, QueryError> {
        let name = normalize_key(name)?;
        let key = normalize_key(key)?;
        let read_txn = self.db.begin_read().map_err(storage_error)?;
        let table = read_txn.open_table(ENTRIES).map_err(storage_error)?;

        match table
            .get((name.as_str(), key.as_str()))
            .map_err(storage_error)?
        {
            Some(bytes) => Ok(Some(value_from_bytes(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn get_all(&self, name: &str) -> Result<Option<RegistryEntries>, QueryError> {
        if !self.exists(name, None)? {
            return Ok(None);
        }
        self.read_entries(&normalize_key(name)?).map(Some)
    }

    fn set(&mut self, name: &str, key: &str, value: Value) -> Result<(), QueryError> {
        let name = normalize_key(name)?;
        let key = normalize_key(key)?;
        let bytes = value_to_bytes(&value)?;

        let write_txn = self.db.begin_write().map_err(storage_error)?;
        {
            let mut entries = write_txn.open_table(ENTRIES).map_err(storage_error)?;
            let replaced = entries
                .insert((name.as_str(), key.as_str()), bytes.as_slice())
                .map_err(storage_error)?
                .is_some();

            let mut registries = write_txn.open_table(REGISTRIES).map_err(storage_error)?;
            let count = registries
                .get(name.as_str())
                .map_err(storage_error)?
                .map(|v| v.value())
                .unwrap_or(0);
            let count = if replaced { count } else { count.saturating_add(1) };
            registries
                .insert(name.as_str(), count)
                .map_err(storage_error)?;
        }
        write_txn.commit().map_err(storage_error)?;

        tracing::trace!(registry = %name, key = %key, "registry entry stored");
        Ok(())
    }

    fn replace(&mut self, name: &str, entries: RegistryEntries) -> Result<(), QueryError> {
        let name = normalize_key(name)?;
        let mut encoded = Vec::with_capacity(entries.len());
        for (key, value) in &entries {
            encoded.push((normalize_key(key)?, value_to_bytes(value)?));
        }

        let write_txn = self.db.begin_write().map_err(storage_error)?;
        {
            let mut table = write_txn.open_table(ENTRIES).map_err(storage_error)?;

            let mut stale = Vec::new();
            for entry in table.range((name.as_str(), "")..).map_err(storage_error)? {
                let (key, _) = entry.map_err(storage_error)?;
                let (registry, entry_key) = key.value();
                if registry != name {
                    break;
                }
                stale.push(entry_key.to_string());
            }
            for key in &stale {
                table
                    .remove((name.as_str(), key.as_str()))
                    .map_err(storage_error)?;
            }

            let mut count: u64 = 0;
            for (key, bytes) in &encoded {
                let replaced = table
                    .insert((name.as_str(), key.as_str()), bytes.as_slice())
                    .map_err(storage_error)?
                    .is_some();
                if !replaced {
                    count = count.saturating_add(1);
                }
            }

            let mut registries = write_txn.open_table(REGISTRIES).map_err(storage_error)?;
            registries
                .insert(name.as_str(), count)
                .map_err(storage_error)?;
        }
        write_txn.commit().map_err(storage_error)?;

        tracing::debug!(registry = %name, entries = encoded.len(), "registry replaced");
        Ok(())
    }

    fn names(&self) -> Result<Vec<String>, QueryError> {
        let read_txn = self.db.begin_read().map_err(storage_error)?;
        let table = read_txn.open_table(REGISTRIES).map_err(storage_error)?;

        let mut names = Vec::new();
        for entry in table.iter().map_err(storage_error)? {
            let (name, _) = entry.map_err(storage_error)?;
            names.push(name.value().to_string());
        }
        Ok(names)
    }
}

// =============================================================================
// TESTS
// =============================================================================
