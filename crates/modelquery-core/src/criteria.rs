//! # Criteria Assembler
//!
//! Appends the standard, registry-driven filters to a query object.
//!
//! Four settings are read from the query object's model registry, always
//! in this order:
//!
//! | setting                          | skipped when        | filter                       |
//! |----------------------------------|---------------------|------------------------------|
//! | `criteria_catalog_type_id`       | integer reading 0   | `catalog_type_id IN` integer |
//! | `criteria_extension_instance_id` | integer reading 0   | `extension_instance_id =`    |
//! | `criteria_menu_id`               | integer reading 0   | `menu_id =`                  |
//! | `criteria_status`                | trimmed `""`/`"0"`  | `status IN` string           |
//!
//! A filter is only appended when the model's field set has the column.

use crate::primitives::{
    CRITERIA_CATALOG_TYPE_ID, CRITERIA_EXTENSION_INSTANCE_ID, CRITERIA_MENU_ID, CRITERIA_STATUS,
    DEFAULT_PRIMARY_PREFIX, PRIMARY_PREFIX_KEY,
};
use crate::query::{ClauseType, Operator, QueryObject, WhereClause};
use crate::types::{integer_value, text_value};
use serde_json::Value;

/// Stateless assembler of the standard criteria.
pub struct CriteriaAssembler;

impl CriteriaAssembler {
    /// Append every applicable standard filter to `query`.
    ///
    /// Uses the registry's `primary_prefix` (default `"a"`) as table alias.
    /// Returns the clauses that were appended, in order.
    pub fn apply(query: &mut dyn QueryObject) -> Vec<WhereClause> {
        let prefix = text_value(
            &query.model_registry_value(PRIMARY_PREFIX_KEY, Value::from(DEFAULT_PRIMARY_PREFIX)),
        );
        Self::apply_with_prefix(query, &prefix)
    }

    /// Append every applicable standard filter using an explicit alias.
    pub fn apply_with_prefix(query: &mut dyn QueryObject, prefix: &str) -> Vec<WhereClause> {
        let candidates = [
            Self::catalog_type_id(query, prefix),
            Self::extension_instance_id(query, prefix),
            Self::menu_id(query, prefix),
            Self::status(query, prefix),
        ];

        let mut applied = Vec::new();
        for clause in candidates.into_iter().flatten() {
            tracing::debug!(clause = %clause, "standard criteria appended");
            query.add_where(clause.clone());
            applied.push(clause);
        }
        applied
    }

    fn catalog_type_id(query: &dyn QueryObject, prefix: &str) -> Option<WhereClause> {
        let raw = query.model_registry_value(CRITERIA_CATALOG_TYPE_ID, Value::from(""));
        if integer_value(&raw) == 0 {
            return None;
        }
        Self::for_column(query, prefix, "catalog_type_id", Operator::In, ClauseType::Integer, raw)
    }

    fn extension_instance_id(query: &dyn QueryObject, prefix: &str) -> Option<WhereClause> {
        let id = integer_value(&query.model_registry_value(CRITERIA_EXTENSION_INSTANCE_ID, Value::from(0)));
        if id == 0 {
            return None;
        }
        Self::for_column(
            query,
            prefix,
            "extension_instance_id",
            Operator::Equal,
            ClauseType::Integer,
            Value::from(id),
        )
    }

    fn menu_id(query: &dyn QueryObject, prefix: &str) -> Option<WhereClause> {
        let id = integer_value(&query.model_registry_value(CRITERIA_MENU_ID, Value::from(0)));
        if id == 0 {
            return None;
        }
        Self::for_column(query, prefix, "menu_id", Operator::Equal, ClauseType::Integer, Value::from(id))
    }

    fn status(query: &dyn QueryObject, prefix: &str) -> Option<WhereClause> {
        let raw = text_value(&query.model_registry_value(CRITERIA_STATUS, Value::from("")));
        let status = raw.trim();
        if status.is_empty() || status == "0" {
            return None;
        }
        Self::for_column(
            query,
            prefix,
            "status",
            Operator::In,
            ClauseType::String,
            Value::from(status),
        )
    }

    fn for_column(
        query: &dyn QueryObject,
        prefix: &str,
        column: &str,
        operator: Operator,
        data_type: ClauseType,
        value: Value,
    ) -> Option<WhereClause> {
        if !query.model_registry().has_field(column) {
            tracing::debug!(column, "standard criteria skipped: column not in model");
            return None;
        }
        let clause = WhereClause::column(format!("{}.{}", prefix, column), operator, data_type, value);
        if clause.is_empty_list() {
            tracing::debug!(column, "standard criteria skipped: empty member list");
            return None;
        }
        Some(clause)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryQuery;
    use crate::{FieldDefinition, ModelRegistry};
    use serde_json::json;

    fn standard_registry() -> ModelRegistry {
        ModelRegistry::new()
            .with_field(FieldDefinition::new("catalog_type_id", "integer"))
            .with_field(FieldDefinition::new("extension_instance_id", "integer"))
            .with_field(FieldDefinition::new("menu_id", "integer"))
            .with_field(FieldDefinition::new("status", "integer"))
    }

    #[test]
    fn no_settings_no_filters() {
        let mut query = MemoryQuery::new(standard_registry(), Vec::new());
        assert!(CriteriaAssembler::apply(&mut query).is_empty());
        assert!(query.where_clauses().is_empty());
    }

    #[test]
    fn all_settings_in_fixed_order() {
        let registry = standard_registry()
            .with_setting("criteria_status", "1,2")
            .with_setting("criteria_menu_id", 9)
            .with_setting("criteria_extension_instance_id", "12")
            .with_setting("criteria_catalog_type_id", "10,20");
        let mut query = MemoryQuery::new(registry, Vec::new());

        let rendered: Vec<String> = CriteriaAssembler::apply(&mut query)
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            rendered,
            vec![
                "a.catalog_type_id IN (10,20)",
                "a.extension_instance_id = 12",
                "a.menu_id = 9",
                "a.status IN ('1','2')",
            ]
        );
        assert_eq!(query.where_clauses().len(), 4);
    }

    #[test]
    fn zero_and_empty_settings_are_skipped() {
        let registry = standard_registry()
            .with_setting("criteria_status", " 0 ")
            .with_setting("criteria_menu_id", "0")
            .with_setting("criteria_extension_instance_id", 0)
            .with_setting("criteria_catalog_type_id", "abc");
        let mut query = MemoryQuery::new(registry, Vec::new());

        assert!(CriteriaAssembler::apply(&mut query).is_empty());
    }

    #[test]
    fn list_without_members_is_skipped() {
        let registry = standard_registry()
            .with_setting("criteria_status", ",")
            .with_setting("criteria_menu_id", 2);
        let mut query = MemoryQuery::new(registry, Vec::new());

        let rendered: Vec<String> = CriteriaAssembler::apply(&mut query)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, vec!["a.menu_id = 2"]);
        assert_eq!(query.where_clauses().len(), 1);
    }

    #[test]
    fn missing_column_suppresses_filter() {
        let registry = ModelRegistry::new()
            .with_field(FieldDefinition::new("status", "integer"))
            .with_setting("criteria_menu_id", 4)
            .with_setting("criteria_status", "1");
        let mut query = MemoryQuery::new(registry, Vec::new());

        let applied = CriteriaAssembler::apply(&mut query);
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].column, "a.status");
    }

    #[test]
    fn primary_prefix_is_honoured() {
        let registry = standard_registry()
            .with_setting("primary_prefix", "c")
            .with_setting("criteria_menu_id", 3);
        let mut query = MemoryQuery::new(registry, Vec::new());

        let applied = CriteriaAssembler::apply(&mut query);
        assert_eq!(applied[0].to_string(), "c.menu_id = 3");
        assert_eq!(applied[0].value, json!(3));
    }
}
