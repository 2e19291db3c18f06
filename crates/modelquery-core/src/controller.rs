//! # Query Controller
//!
//! Bootstraps a query object for one request and drives its execution.
//!
//! 1. Resolve `query://<namespace>` from a `ResourceLocator`, seeded with
//!    the normalized CRUD type and the runtime context
//! 2. Apply the registry flags (`ControllerDefaults` or individual setters)
//! 3. `run_query`: optionally append the standard criteria, set the SQL,
//!    execute the requested operation
//! 4. Shape the returned rows against the model registry
//!
//! Locator and execution failures are re-raised as `QueryError::Runtime`
//! with the original message.

use crate::criteria::CriteriaAssembler;
use crate::database::ReadController;
use crate::fields::FieldProcessor;
use crate::primitives::{DEFAULT_QUERY_OBJECT, GET_CUSTOMFIELDS_KEY, QUERY_OBJECT_KEY, QUERY_URI_SCHEME};
use crate::query::QueryObject;
use crate::sanitize::FieldSanitizer;
use crate::{CrudType, ModelRegistry, QueryError, QueryOutput, Record, ResultObject};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// =============================================================================
// RESOURCE LOCATOR
// =============================================================================

/// Resolves query objects by URI.
pub trait ResourceLocator {
    /// The locator's own failure type.
    type Error: std::error::Error;

    /// Resolve `uri` (e.g. `query://Articles`) into a configured query object.
    fn get(&self, uri: &str, options: &QueryOptions) -> Result<Box<dyn QueryObject>, Self::Error>;
}

/// Lookup failures of the built-in locators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    /// The URI does not use the `query://` scheme.
    #[error("Unsupported resource URI: {0}")]
    InvalidUri(String),

    /// No model is registered under the namespace.
    #[error("Resource not found: {0}")]
    NotFound(String),
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Request-scoped data handed to every query object the controller resolves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeContext {
    pub runtime_data: Value,
    pub plugin_data: Option<Value>,
}

impl RuntimeContext {
    /// Context with runtime data and no plugin data.
    #[must_use]
    pub fn new(runtime_data: Value) -> Self {
        Self {
            runtime_data,
            plugin_data: None,
        }
    }

    /// Attach plugin data.
    #[must_use]
    pub fn with_plugin_data(mut self, plugin_data: Value) -> Self {
        self.plugin_data = Some(plugin_data);
        self
    }
}

/// Options passed to the locator when resolving a query object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOptions {
    pub crud_type: CrudType,
    pub runtime_data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_data: Option<Value>,
}

impl QueryOptions {
    /// Build options from a raw CRUD type name.
    ///
    /// The name is matched case-insensitively; anything unrecognized
    /// becomes `Read`.
    #[must_use]
    pub fn new(crud_type: &str, context: &RuntimeContext) -> Self {
        Self {
            crud_type: CrudType::parse_lenient(crud_type),
            runtime_data: context.runtime_data.clone(),
            plugin_data: context.plugin_data.clone(),
        }
    }
}

/// Registry flags applied right after a query object is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerDefaults {
    pub process_events: bool,
    pub query_object: String,
    pub get_customfields: bool,
    pub use_special_joins: bool,
    pub use_pagination: bool,
    pub check_view_level_access: bool,
    pub get_item_children: bool,
}

impl Default for ControllerDefaults {
    fn default() -> Self {
        Self {
            process_events: false,
            query_object: DEFAULT_QUERY_OBJECT.to_string(),
            get_customfields: false,
            use_special_joins: false,
            use_pagination: false,
            check_view_level_access: false,
            get_item_children: false,
        }
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Owns one query object and a snapshot of its model registry for the
/// duration of a request.
pub struct QueryController {
    query: Box<dyn QueryObject>,
    model_registry: ModelRegistry,
    executed_sql: Option<String>,
}

impl std::fmt::Debug for QueryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryController")
            .field("fields", &self.model_registry.fields.len())
            .field("executed_sql", &self.executed_sql)
            .finish_non_exhaustive()
    }
}

impl QueryController {
    /// Resolve `query://<namespace>` and wrap the result.
    ///
    /// # Errors
    /// Returns `QueryError::Runtime` carrying the locator's message.
    pub fn resolve<L: ResourceLocator + ?Sized>(
        locator: &L,
        namespace: &str,
        crud_type: &str,
        context: &RuntimeContext,
    ) -> Result<Self, QueryError> {
        let options = QueryOptions::new(crud_type, context);
        let uri = format!("{}{}", QUERY_URI_SCHEME, namespace);

        tracing::debug!(uri = %uri, crud_type = %options.crud_type, "resolving query object");

        let query = locator
            .get(&uri, &options)
            .map_err(|e| QueryError::Runtime(e.to_string()))?;

        Ok(Self::from_query(query))
    }

    /// Wrap an already-resolved query object.
    #[must_use]
    pub fn from_query(query: Box<dyn QueryObject>) -> Self {
        let model_registry = query.model_registry().clone();
        Self {
            query,
            model_registry,
            executed_sql: None,
        }
    }

    // =========================================================================
    // REGISTRY FLAGS
    // =========================================================================

    /// Apply every default flag in one go.
    pub fn apply_defaults(&mut self, defaults: &ControllerDefaults) -> &mut Self {
        self.set_process_events(defaults.process_events)
            .set_query_object(&defaults.query_object)
            .set_get_customfields(defaults.get_customfields)
            .set_use_special_joins(defaults.use_special_joins)
            .set_use_pagination(defaults.use_pagination)
            .set_check_view_level_access(defaults.check_view_level_access)
            .set_get_item_children(defaults.get_item_children)
    }

    pub fn set_process_events(&mut self, on: bool) -> &mut Self {
        self.set_flag("process_events", on)
    }

    pub fn set_query_object(&mut self, query_object: &str) -> &mut Self {
        self.set_registry(QUERY_OBJECT_KEY, Value::from(query_object))
    }

    pub fn set_get_customfields(&mut self, on: bool) -> &mut Self {
        self.set_flag(GET_CUSTOMFIELDS_KEY, on)
    }

    pub fn set_use_special_joins(&mut self, on: bool) -> &mut Self {
        self.set_flag("use_special_joins", on)
    }

    pub fn set_use_pagination(&mut self, on: bool) -> &mut Self {
        self.set_flag("use_pagination", on)
    }

    pub fn set_check_view_level_access(&mut self, on: bool) -> &mut Self {
        self.set_flag("check_view_level_access", on)
    }

    pub fn set_get_item_children(&mut self, on: bool) -> &mut Self {
        self.set_flag("get_item_children", on)
    }

    /// Store an arbitrary registry setting on the query object.
    pub fn set_registry(&mut self, key: &str, value: Value) -> &mut Self {
        self.query.set_model_registry(key, value.clone());
        self.model_registry.set(key, value);
        self
    }

    fn set_flag(&mut self, key: &str, on: bool) -> &mut Self {
        self.set_registry(key, Value::from(u8::from(on)))
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// The registry snapshot.
    #[must_use]
    pub fn model_registry(&self) -> &ModelRegistry {
        &self.model_registry
    }

    /// The wrapped query object.
    #[must_use]
    pub fn query(&self) -> &dyn QueryObject {
        self.query.as_ref()
    }

    /// SQL set by the most recent `run_query`.
    #[must_use]
    pub fn executed_sql(&self) -> Option<&str> {
        self.executed_sql.as_deref()
    }

    // =========================================================================
    // EXECUTION
    // =========================================================================

    /// Execute `operation`.
    ///
    /// When no explicit SQL is given and `standard_criteria` is set, the
    /// standard criteria are appended first.
    ///
    /// # Errors
    /// Any failure of the query object is returned as `QueryError::Runtime`.
    pub fn run_query(
        &mut self,
        operation: CrudType,
        sql: Option<&str>,
        standard_criteria: bool,
    ) -> Result<QueryOutput, QueryError> {
        if sql.is_none() && standard_criteria {
            CriteriaAssembler::apply(self.query.as_mut());
        }

        self.executed_sql = self.query.set_sql(sql);
        tracing::debug!(
            operation = %operation,
            sql = self.executed_sql.as_deref().unwrap_or_default(),
            "running query"
        );

        self.query.execute(operation).map_err(QueryError::into_runtime)
    }

    /// Shape rows against the registry snapshot.
    ///
    /// Custom field groups are expanded when `get_customfields` is on.
    pub fn shape_rows<S: FieldSanitizer + ?Sized>(
        &self,
        rows: &[Record],
        sanitizer: &S,
    ) -> Result<Vec<ResultObject>, QueryError> {
        let processor = FieldProcessor::new(sanitizer);
        let include_custom = self.model_registry.flag(GET_CUSTOMFIELDS_KEY);

        rows.iter()
            .map(|row| processor.shape(row, &self.model_registry, include_custom))
            .collect()
    }
}

impl ReadController for QueryController {
    fn get_data(&mut self) -> Result<QueryOutput, QueryError> {
        self.run_query(CrudType::Read, None, true)
    }
}

// =============================================================================
// TESTS
// =============================================================================
