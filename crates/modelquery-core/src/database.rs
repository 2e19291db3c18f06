//! # Database Contracts
//!
//! Connection, statement execution and CRUD model traits implemented by
//! database drivers.
//!
//! The read, create and update models are provided for every `Database`
//! through blanket implementations, so a driver only implements
//! `Connection` and `Database`.

use crate::{QueryError, QueryOutput, Record};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Driver-specific connection settings (host, user, database, ...).
pub type ConnectionOptions = BTreeMap<String, Value>;

/// Opening and closing a database connection.
pub trait Connection {
    /// Open the connection.
    fn connect(&mut self, options: &ConnectionOptions) -> Result<(), QueryError>;

    /// Close the connection. Closing a closed connection is a no-op.
    fn disconnect(&mut self) -> Result<(), QueryError>;

    /// True while the connection is open.
    fn is_connected(&self) -> bool;
}

/// Statement execution on an open connection.
pub trait Database {
    /// Execute `sql` and return the first column of the first row.
    fn load_result(&mut self, sql: &str) -> Result<Value, QueryError>;

    /// Execute `sql` and return every row.
    fn load_object_list(&mut self, sql: &str) -> Result<Vec<Record>, QueryError>;

    /// Execute a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str) -> Result<u64, QueryError>;

    /// Identifier generated by the most recent insert.
    fn insert_id(&self) -> u64;
}

/// Reads shaped by query object kind.
pub trait ReadModel {
    /// Run a read.
    ///
    /// `query_object` selects the shape: `result` (one value), `item`
    /// (first row), `list` (all rows) or `distinct` (all unique rows).
    fn get_data(&mut self, query_object: &str, sql: &str) -> Result<QueryOutput, QueryError>;
}

/// Inserts.
pub trait CreateModel {
    /// Run an insert and return the generated identifier.
    fn insert_data(&mut self, sql: &str) -> Result<u64, QueryError>;
}

/// Updates.
pub trait UpdateModel {
    /// Run an update and return the number of affected rows.
    fn update_data(&mut self, sql: &str) -> Result<u64, QueryError>;
}

/// A controller that can read its configured model.
pub trait ReadController {
    /// Read using the controller's current configuration.
    fn get_data(&mut self) -> Result<QueryOutput, QueryError>;
}

impl<D: Database + ?Sized> ReadModel for D {
    fn get_data(&mut self, query_object: &str, sql: &str) -> Result<QueryOutput, QueryError> {
        match query_object.to_ascii_lowercase().as_str() {
            "result" => Ok(QueryOutput::Value(self.load_result(sql)?)),
            "item" => {
                let rows = self.load_object_list(sql)?;
                Ok(QueryOutput::Rows(rows.into_iter().take(1).collect()))
            }
            "list" => Ok(QueryOutput::Rows(self.load_object_list(sql)?)),
            "distinct" => {
                let mut seen = BTreeSet::new();
                let rows = self
                    .load_object_list(sql)?
                    .into_iter()
                    .filter(|row| seen.insert(Value::Object(row.clone()).to_string()))
                    .collect();
                Ok(QueryOutput::Rows(rows))
            }
            other => Err(QueryError::Configuration(format!(
                "Unknown query object: {}",
                other
            ))),
        }
    }
}

impl<D: Database + ?Sized> CreateModel for D {
    fn insert_data(&mut self, sql: &str) -> Result<u64, QueryError> {
        self.execute(sql)?;
        Ok(self.insert_id())
    }
}

impl<D: Database + ?Sized> UpdateModel for D {
    fn update_data(&mut self, sql: &str) -> Result<u64, QueryError> {
        self.execute(sql)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDatabase;
    use serde_json::json;

    fn rows() -> Vec<Record> {
        [json!({"id": 1, "title": "a"}), json!({"id": 1, "title": "a"}), json!({"id": 2, "title": "b"})]
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn read_shapes_follow_query_object() {
        let mut db = MemoryDatabase::connected(rows());

        assert_eq!(db.get_data("result", "SELECT").expect("result"), QueryOutput::Value(json!(1)));
        assert_eq!(db.get_data("item", "SELECT").expect("item").rows().len(), 1);
        assert_eq!(db.get_data("list", "SELECT").expect("list").rows().len(), 3);
        assert_eq!(db.get_data("DISTINCT", "SELECT").expect("distinct").rows().len(), 2);
    }

    #[test]
    fn unknown_query_object_is_rejected() {
        let mut db = MemoryDatabase::connected(rows());
        let err = db.get_data("tree", "SELECT").expect_err("must fail");
        assert!(matches!(err, QueryError::Configuration(_)));
    }

    #[test]
    fn insert_returns_generated_id() {
        let mut db = MemoryDatabase::connected(Vec::new());
        assert_eq!(db.insert_data("INSERT INTO t VALUES (1)").expect("insert"), 1);
        assert_eq!(db.insert_data("INSERT INTO t VALUES (2)").expect("insert"), 2);
        assert_eq!(db.insert_id(), 2);
    }

    #[test]
    fn closed_connection_fails_at_runtime() {
        let mut db = MemoryDatabase::connected(rows());
        db.disconnect().expect("disconnect");
        assert!(!db.is_connected());

        let err = db.update_data("UPDATE t SET x = 1").expect_err("must fail");
        assert!(matches!(err, QueryError::Runtime(_)));

        db.connect(&ConnectionOptions::new()).expect("connect");
        assert_eq!(db.update_data("UPDATE t SET x = 1").expect("update"), 3);
    }
}
