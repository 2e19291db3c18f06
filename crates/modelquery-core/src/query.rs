//! # Query Module
//!
//! The contract between the modelquery core and the external query object.
//!
//! - `WhereClause`: a structured filter condition, renderable as SQL text
//! - `QueryObject`: filter accumulation, registry access and execution
//! - `QueryBuilder`: read-only view of the query being built
//!
//! Execution is selected by `CrudType`, a closed set of operations.

use crate::types::{leading_integer, text_value};
use crate::{CrudType, ModelRegistry, QueryError, QueryOutput};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

// =============================================================================
// WHERE CLAUSES
// =============================================================================

/// What the left-hand side of a condition refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// A table column.
    Column,
}

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "IN")]
    In,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => f.write_str("="),
            Self::In => f.write_str("IN"),
        }
    }
}

/// How the right-hand side value is quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseType {
    Integer,
    String,
}

/// A single filter condition appended to a query object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhereClause {
    pub kind: ConditionKind,
    /// Prefixed column, e.g. `a.status`.
    pub column: String,
    pub operator: Operator,
    pub data_type: ClauseType,
    /// Raw value. `IN` values may be comma-separated lists.
    pub value: Value,
}

impl WhereClause {
    /// Column condition helper.
    #[must_use]
    pub fn column(
        column: impl Into<String>,
        operator: Operator,
        data_type: ClauseType,
        value: Value,
    ) -> Self {
        Self {
            kind: ConditionKind::Column,
            column: column.into(),
            operator,
            data_type,
            value,
        }
    }

    /// True for an `IN` condition whose value names no members.
    #[must_use]
    pub fn is_empty_list(&self) -> bool {
        self.operator == Operator::In && self.members().is_empty()
    }

    /// Individual members of the value, split on commas for lists.
    fn members(&self) -> Vec<String> {
        let raw: Vec<String> = match &self.value {
            Value::Array(items) => items.iter().map(text_value).collect(),
            other => text_value(other)
                .split(',')
                .map(|part| part.trim().to_string())
                .collect(),
        };
        raw.into_iter().filter(|part| !part.is_empty()).collect()
    }

    fn quote(&self, member: &str) -> String {
        match self.data_type {
            ClauseType::Integer => leading_integer(member).to_string(),
            ClauseType::String => format!("'{}'", member.replace('\'', "''")),
        }
    }
}

impl fmt::Display for WhereClause {
    /// Render as SQL text: `a.menu_id = 5`, `a.status IN ('1','2')`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::In => {
                let members: Vec<String> = self.members().iter().map(|m| self.quote(m)).collect();
                write!(f, "{} IN ({})", self.column, members.join(","))
            }
            Operator::Equal => {
                let rendered = self.quote(text_value(&self.value).trim());
                write!(f, "{} = {}", self.column, rendered)
            }
        }
    }
}

// =============================================================================
// QUERY OBJECT
// =============================================================================

/// The external query object configured by the controller.
///
/// Implementors own SQL generation and execution; the core only appends
/// filters, reads and writes registry settings, and picks the operation.
pub trait QueryObject {
    /// Set explicit SQL, or `None` to let the object build its own.
    /// Returns the SQL that will execute.
    fn set_sql(&mut self, sql: Option<&str>) -> Option<String>;

    /// Append a filter condition.
    fn add_where(&mut self, clause: WhereClause);

    /// Filter conditions appended so far, in order.
    fn where_clauses(&self) -> &[WhereClause];

    /// Store a registry setting.
    fn set_model_registry(&mut self, key: &str, value: Value);

    /// The model registry this object executes against.
    fn model_registry(&self) -> &ModelRegistry;

    /// Read a registry setting, or `default` when it is unset.
    fn model_registry_value(&self, key: &str, default: Value) -> Value {
        self.model_registry().get_or(key, default)
    }

    /// Execute the requested operation.
    fn execute(&mut self, operation: CrudType) -> Result<QueryOutput, QueryError>;
}

/// Read-only view of the query being built.
pub trait QueryBuilder {
    /// Kind of read requested: `result`, `item`, `list` or `distinct`.
    fn query_object(&self) -> String;

    /// The SQL text that would execute now.
    fn query_string(&self) -> String;
}

// =============================================================================
// TESTS
// =============================================================================
