//! # Storage
//!
//! Disk-backed registry storage.

mod redb_registry;

pub use redb_registry::RedbRegistry;
