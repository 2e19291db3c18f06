//! # modelquery-core
//!
//! Model-driven query assembly and record shaping.
//!
//! A model is described by a `ModelRegistry`: its field definitions, its
//! custom field groups and free-form settings. From that registry this crate
//!
//! - adds the standard filter criteria (catalog type, extension instance,
//!   menu, status) to a query object,
//! - runs the query through a pluggable data access layer,
//! - shapes each raw record into a `ResultObject` with sorted keys, declared
//!   defaults and decoded custom field groups.
//!
//! ## Seams
//!
//! Query objects, resource location, field sanitizing, database access,
//! configuration loading and registry storage are all traits. `memory`
//! provides in-process implementations; `storage` provides a redb-backed
//! registry.
//!
//! The crate is synchronous and has no network dependencies.

// =============================================================================
// MODULES
// =============================================================================

pub mod config;
pub mod controller;
pub mod criteria;
pub mod database;
pub mod fields;
pub mod formats;
pub mod memory;
pub mod primitives;
pub mod query;
pub mod registry;
pub mod sanitize;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CrudType, FieldDefinition, FieldSet, ModelRegistry, QueryError, QueryOutput, Record,
    ResultObject, ResultValue,
};

// =============================================================================
// RE-EXPORTS: Query Assembly
// =============================================================================

pub use controller::{
    ControllerDefaults, LocatorError, QueryController, QueryOptions, ResourceLocator,
    RuntimeContext,
};
pub use criteria::CriteriaAssembler;
pub use database::{Connection, CreateModel, Database, ReadController, ReadModel, UpdateModel};
pub use fields::FieldProcessor;
pub use query::{ClauseType, Operator, QueryBuilder, QueryObject, WhereClause};
pub use sanitize::{FieldSanitizer, PassthroughSanitizer, ResolvedField, TypeSanitizer};

// =============================================================================
// RE-EXPORTS: Configuration and Storage
// =============================================================================

pub use config::{ConfigurationSource, TomlConfiguration};
pub use formats::{PersistenceHeader, value_from_bytes, value_to_bytes};
pub use memory::{MemoryDatabase, MemoryLocator, MemoryQuery};
pub use registry::{MemoryRegistry, Registry};
pub use storage::RedbRegistry;
