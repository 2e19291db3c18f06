//! # In-Memory Backend
//!
//! A fixture database, query object and locator that run without a SQL
//! server. The database answers every read with its fixed row set; it
//! does not interpret SQL.
//!
//! Used by the CLI and by tests.

use crate::controller::{LocatorError, QueryOptions, ResourceLocator};
use crate::database::{Connection, ConnectionOptions, CreateModel, Database, ReadModel, UpdateModel};
use crate::primitives::{
    DEFAULT_PRIMARY_PREFIX, DEFAULT_QUERY_OBJECT, PRIMARY_PREFIX_KEY, QUERY_OBJECT_KEY,
    QUERY_URI_SCHEME,
};
use crate::query::{QueryBuilder, QueryObject, WhereClause};
use crate::types::{integer_value, text_value};
use crate::{CrudType, ModelRegistry, QueryError, QueryOutput, Record};
use serde_json::Value;
use std::collections::BTreeMap;

// =============================================================================
// DATABASE
// =============================================================================

/// A database holding a fixed row set.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    rows: Vec<Record>,
    connected: bool,
    last_insert_id: u64,
    statements: Vec<String>,
}

impl MemoryDatabase {
    /// A closed database over `rows`.
    #[must_use]
    pub fn new(rows: Vec<Record>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// An open database over `rows`.
    #[must_use]
    pub fn connected(rows: Vec<Record>) -> Self {
        Self {
            connected: true,
            ..Self::new(rows)
        }
    }

    /// Every statement executed so far, in order.
    #[must_use]
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    fn record(&mut self, sql: &str) -> Result<(), QueryError> {
        if !self.connected {
            return Err(QueryError::Runtime(
                "Database connection is not open".to_string(),
            ));
        }
        self.statements.push(sql.to_string());
        Ok(())
    }
}

impl Connection for MemoryDatabase {
    fn connect(&mut self, _options: &ConnectionOptions) -> Result<(), QueryError> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), QueryError> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl Database for MemoryDatabase {
    fn load_result(&mut self, sql: &str) -> Result<Value, QueryError> {
        self.record(sql)?;
        Ok(self
            .rows
            .first()
            .and_then(|row| row.values().next())
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn load_object_list(&mut self, sql: &str) -> Result<Vec<Record>, QueryError> {
        self.record(sql)?;
        Ok(self.rows.clone())
    }

    /// Inserts report one affected row and advance the insert id;
    /// updates and deletes report the size of the row set.
    fn execute(&mut self, sql: &str) -> Result<u64, QueryError> {
        self.record(sql)?;
        let verb = sql
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();

        let affected = match verb.as_str() {
            "INSERT" => {
                self.last_insert_id = self.last_insert_id.saturating_add(1);
                1
            }
            "UPDATE" | "DELETE" => self.rows.len() as u64,
            _ => 0,
        };
        Ok(affected)
    }

    fn insert_id(&self) -> u64 {
        self.last_insert_id
    }
}

// =============================================================================
// QUERY OBJECT
// =============================================================================

/// A query object over a `MemoryDatabase`.
///
/// Reads without explicit SQL build a `SELECT` from the registry and the
/// accumulated where-clauses. Writes need explicit SQL.
#[derive(Debug, Clone)]
pub struct MemoryQuery {
    registry: ModelRegistry,
    clauses: Vec<WhereClause>,
    sql: Option<String>,
    database: MemoryDatabase,
}

impl MemoryQuery {
    /// Create a query object over `rows`, with an open database.
    #[must_use]
    pub fn new(registry: ModelRegistry, rows: Vec<Record>) -> Self {
        Self {
            registry,
            clauses: Vec::new(),
            sql: None,
            database: MemoryDatabase::connected(rows),
        }
    }

    /// The underlying database.
    #[must_use]
    pub fn database(&self) -> &MemoryDatabase {
        &self.database
    }

    /// Mutable access to the underlying database.
    pub fn database_mut(&mut self) -> &mut MemoryDatabase {
        &mut self.database
    }

    fn table(&self) -> String {
        self.registry
            .get("table_name")
            .or_else(|| self.registry.get("model_name"))
            .map(text_value)
            .unwrap_or_else(|| "content".to_string())
    }

    fn build_select(&self) -> String {
        let prefix = text_value(
            &self
                .registry
                .get_or(PRIMARY_PREFIX_KEY, Value::from(DEFAULT_PRIMARY_PREFIX)),
        );
        let distinct = if self.query_object() == "distinct" {
            "DISTINCT "
        } else {
            ""
        };

        let mut sql = format!("SELECT {}{}.* FROM {} AS {}", distinct, prefix, self.table(), prefix);

        if !self.clauses.is_empty() {
            let conditions: Vec<String> = self.clauses.iter().map(ToString::to_string).collect();
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if self.registry.flag("use_pagination") {
            let count = integer_value(&self.registry.get_or("model_count", Value::from(0)));
            let offset = integer_value(&self.registry.get_or("model_offset", Value::from(0)));
            if count > 0 {
                sql.push_str(&format!(" LIMIT {} OFFSET {}", count, offset.max(0)));
            }
        }

        sql
    }

    fn explicit_sql(&self, operation: CrudType) -> Result<String, QueryError> {
        self.sql.clone().ok_or_else(|| {
            QueryError::Runtime(format!("{} requires explicit SQL", operation))
        })
    }
}

impl QueryBuilder for MemoryQuery {
    fn query_object(&self) -> String {
        text_value(
            &self
                .registry
                .get_or(QUERY_OBJECT_KEY, Value::from(DEFAULT_QUERY_OBJECT)),
        )
        .to_ascii_lowercase()
    }

    fn query_string(&self) -> String {
        self.sql.clone().unwrap_or_else(|| self.build_select())
    }
}

impl QueryObject for MemoryQuery {
    fn set_sql(&mut self, sql: Option<&str>) -> Option<String> {
        self.sql = sql.map(str::to_string);
        Some(self.query_string())
    }

    fn add_where(&mut self, clause: WhereClause) {
        self.clauses.push(clause);
    }

    fn where_clauses(&self) -> &[WhereClause] {
        &self.clauses
    }

    fn set_model_registry(&mut self, key: &str, value: Value) {
        self.registry.set(key, value);
    }

    fn model_registry(&self) -> &ModelRegistry {
        &self.registry
    }

    fn execute(&mut self, operation: CrudType) -> Result<QueryOutput, QueryError> {
        match operation {
            CrudType::Read => {
                let sql = self.query_string();
                let query_object = self.query_object();
                self.database.get_data(&query_object, &sql)
            }
            CrudType::Create => {
                let sql = self.explicit_sql(operation)?;
                Ok(QueryOutput::InsertId(self.database.insert_data(&sql)?))
            }
            CrudType::Update => {
                let sql = self.explicit_sql(operation)?;
                Ok(QueryOutput::Affected(self.database.update_data(&sql)?))
            }
            CrudType::Delete => {
                let sql = self.explicit_sql(operation)?;
                Ok(QueryOutput::Affected(self.database.execute(&sql)?))
            }
        }
    }
}

// =============================================================================
// LOCATOR
// =============================================================================

/// Resolves `query://<namespace>` to a fresh `MemoryQuery`.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocator {
    models: BTreeMap<String, (ModelRegistry, Vec<Record>)>,
}

impl MemoryLocator {
    /// Create an empty locator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model and its rows under `namespace`.
    pub fn register(&mut self, namespace: impl Into<String>, registry: ModelRegistry, rows: Vec<Record>) {
        self.models.insert(namespace.into(), (registry, rows));
    }

    /// Registered namespaces in ascending order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

impl ResourceLocator for MemoryLocator {
    type Error = LocatorError;

    /// The resolved object's registry also carries the options as
    /// `crud_type`, `runtime_data` and `plugin_data`.
    fn get(&self, uri: &str, options: &QueryOptions) -> Result<Box<dyn QueryObject>, LocatorError> {
        let namespace = uri
            .strip_prefix(QUERY_URI_SCHEME)
            .ok_or_else(|| LocatorError::InvalidUri(uri.to_string()))?;

        let (registry, rows) = self
            .models
            .get(namespace)
            .ok_or_else(|| LocatorError::NotFound(namespace.to_string()))?;

        let mut registry = registry.clone();
        registry.set("crud_type", options.crud_type.as_str());
        registry.set("runtime_data", options.runtime_data.clone());
        if let Some(plugin_data) = &options.plugin_data {
            registry.set("plugin_data", plugin_data.clone());
        }

        Ok(Box::new(MemoryQuery::new(registry, rows.clone())))
    }
}

// =============================================================================
// TESTS
// =============================================================================
