//! # Validation Tier Tests (T0-T3)
//!
//! End-to-end behavior of the public API.
//!
//! ## Tiers
//! - T0: Field Shaping
//! - T1: Custom Field Groups
//! - T2: Standard Criteria
//! - T3: Controller Round Trip

use modelquery_core::{
    CriteriaAssembler, FieldDefinition, FieldProcessor, FieldSet, ModelRegistry,
    PassthroughSanitizer, QueryError, QueryObject, Record, ResultValue, TypeSanitizer,
};
use serde_json::{Value, json};

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

// =============================================================================
// TIER T0: FIELD SHAPING
// =============================================================================

mod t0_field_shaping {
    use super::*;

    /// T0.1: A declared field is copied from the record.
    #[test]
    fn declared_field_copied() {
        let registry = ModelRegistry::new().with_field(FieldDefinition::new("status", "string"));

        let shaped = FieldProcessor::new(&PassthroughSanitizer)
            .standard_fields(&record(json!({"status": "1"})), &registry)
            .expect("shape");

        assert_eq!(shaped.to_json(), json!({"status": "1"}));
    }

    /// T0.2: An empty field definition names its registry key.
    #[test]
    fn empty_definition_rejected() {
        let mut registry = ModelRegistry::new();
        registry
            .fields
            .insert("broken".to_string(), FieldDefinition::default());

        let err = FieldProcessor::new(&PassthroughSanitizer)
            .standard_fields(&Record::new(), &registry)
            .expect_err("must fail");

        assert!(matches!(err, QueryError::Configuration(_)));
        assert!(err.to_string().contains("broken"));
    }

    /// T0.3: Missing fields take their default; fields without one are null.
    #[test]
    fn missing_fields_defaulted() {
        let registry = ModelRegistry::new()
            .with_field(FieldDefinition::new("title", "string").with_default("untitled"))
            .with_field(FieldDefinition::new("alias", "string"));

        let shaped = FieldProcessor::new(&PassthroughSanitizer)
            .standard_fields(&Record::new(), &registry)
            .expect("shape");

        assert_eq!(shaped.to_json(), json!({"alias": null, "title": "untitled"}));
    }

    /// T0.4: Output keys are ascending regardless of record order.
    #[test]
    fn keys_sorted() {
        let registry = ModelRegistry::new()
            .with_field(FieldDefinition::new("zeta", "string"))
            .with_field(FieldDefinition::new("alpha", "string"))
            .with_field(FieldDefinition::new("mid", "string"));

        let shaped = FieldProcessor::new(&PassthroughSanitizer)
            .standard_fields(&record(json!({"zeta": 1, "mid": 2, "alpha": 3})), &registry)
            .expect("shape");

        assert_eq!(shaped.keys().collect::<Vec<_>>(), vec!["alpha", "mid", "zeta"]);
    }

    /// T0.5: The type sanitizer coerces by declared type.
    #[test]
    fn typed_sanitizing() {
        let registry = ModelRegistry::new()
            .with_field(FieldDefinition::new("id", "integer"))
            .with_field(FieldDefinition::new("title", "string"));

        let shaped = FieldProcessor::new(&TypeSanitizer)
            .standard_fields(&record(json!({"id": "42", "title": "  Hello "})), &registry)
            .expect("shape");

        assert_eq!(shaped.scalar("id"), Some(&json!(42)));
        assert_eq!(shaped.scalar("title"), Some(&json!("Hello")));
    }
}

// =============================================================================
// TIER T1: CUSTOM FIELD GROUPS
// =============================================================================

mod t1_custom_groups {
    use super::*;

    fn metadata_fields() -> FieldSet {
        let mut fields = FieldSet::new();
        fields.insert(
            "author".to_string(),
            FieldDefinition::new("author", "string").with_default("anonymous"),
        );
        fields.insert("keywords".to_string(), FieldDefinition::new("keywords", "string"));
        fields
    }

    /// T1.1: A group stored as JSON text becomes a nested object.
    #[test]
    fn group_decoded_from_text() {
        let registry = ModelRegistry::new()
            .with_field(FieldDefinition::new("title", "string"))
            .with_group("metadata", metadata_fields());
        let row = record(json!({
            "title": "News",
            "metadata": "{\"keywords\": \"rust\", \"author\": \"amy\"}"
        }));

        let shaped = FieldProcessor::new(&PassthroughSanitizer)
            .shape(&row, &registry, true)
            .expect("shape");

        assert_eq!(
            shaped.to_json(),
            json!({"metadata": {"author": "amy", "keywords": "rust"}, "title": "News"})
        );
    }

    /// T1.2: Undecodable groups fall back to their defaults.
    #[test]
    fn undecodable_group_defaulted() {
        let registry = ModelRegistry::new().with_group("metadata", metadata_fields());
        let row = record(json!({"metadata": "not json"}));

        let shaped = FieldProcessor::new(&PassthroughSanitizer)
            .shape(&row, &registry, true)
            .expect("shape");

        let group = shaped.group("metadata").expect("group");
        assert_eq!(group.scalar("author"), Some(&json!("anonymous")));
        assert_eq!(group.scalar("keywords"), Some(&Value::Null));
    }

    /// T1.3: Without groups the expander returns its input.
    #[test]
    fn no_groups_is_identity() {
        let registry = ModelRegistry::new().with_field(FieldDefinition::new("title", "string"));
        let processor = FieldProcessor::new(&PassthroughSanitizer);
        let row = record(json!({"title": "x"}));

        let base = processor.standard_fields(&row, &registry).expect("shape");
        let expanded = processor
            .custom_fields(base.clone(), &row, &registry)
            .expect("expand");

        assert_eq!(expanded, base);
    }

    /// T1.4: A declared group without a field set is a configuration error.
    #[test]
    fn group_without_fields_rejected() {
        let mut registry = ModelRegistry::new();
        registry.customfieldgroups.push("params".to_string());

        let err = FieldProcessor::new(&PassthroughSanitizer)
            .shape(&Record::new(), &registry, true)
            .expect_err("must fail");

        assert!(matches!(err, QueryError::Configuration(_)));
    }

    /// T1.5: Group columns never appear as plain fields.
    #[test]
    fn group_column_not_scalar() {
        let registry = ModelRegistry::new()
            .with_field(FieldDefinition::new("metadata", "customfield"))
            .with_group("metadata", metadata_fields());

        let shaped = FieldProcessor::new(&PassthroughSanitizer)
            .shape(&Record::new(), &registry, false)
            .expect("shape");

        assert!(shaped.is_empty());
    }
}

// =============================================================================
// TIER T2: STANDARD CRITERIA
// =============================================================================

mod t2_criteria {
    use super::*;
    use modelquery_core::MemoryQuery;

    fn query(settings: &[(&str, Value)]) -> MemoryQuery {
        let mut registry = ModelRegistry::new()
            .with_field(FieldDefinition::new("catalog_type_id", "integer"))
            .with_field(FieldDefinition::new("extension_instance_id", "integer"))
            .with_field(FieldDefinition::new("menu_id", "integer"))
            .with_field(FieldDefinition::new("status", "string"));
        for (key, value) in settings {
            registry.set(*key, value.clone());
        }
        MemoryQuery::new(registry, Vec::new())
    }

    /// T2.1: Empty status adds no filter.
    #[test]
    fn empty_status_ignored() {
        let mut query = query(&[("criteria_status", json!(""))]);
        assert!(CriteriaAssembler::apply(&mut query).is_empty());
        assert!(query.where_clauses().is_empty());
    }

    /// T2.2: A status list becomes a quoted IN filter.
    #[test]
    fn status_list_quoted() {
        let mut query = query(&[("criteria_status", json!("1,2"))]);
        let applied = CriteriaAssembler::apply(&mut query);

        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].to_string(), "a.status IN ('1','2')");
    }

    /// T2.3: Filters are appended in a fixed order with the model's prefix.
    #[test]
    fn fixed_order_with_prefix() {
        let mut query = query(&[
            ("primary_prefix", json!("b")),
            ("criteria_status", json!("1")),
            ("criteria_menu_id", json!(4)),
            ("criteria_extension_instance_id", json!("12")),
            ("criteria_catalog_type_id", json!("1,2")),
        ]);

        let rendered: Vec<String> = CriteriaAssembler::apply(&mut query)
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            rendered,
            vec![
                "b.catalog_type_id IN (1,2)",
                "b.extension_instance_id = 12",
                "b.menu_id = 4",
                "b.status IN ('1')",
            ]
        );
    }

    /// T2.4: Zero settings add nothing.
    #[test]
    fn zero_settings_ignored() {
        let mut query = query(&[
            ("criteria_status", json!("0")),
            ("criteria_menu_id", json!(0)),
            ("criteria_extension_instance_id", json!("0")),
            ("criteria_catalog_type_id", json!(0)),
        ]);
        assert!(CriteriaAssembler::apply(&mut query).is_empty());
    }

    /// T2.5: Columns the model lacks are never filtered.
    #[test]
    fn absent_columns_skipped() {
        let mut query = MemoryQuery::new(
            ModelRegistry::new().with_setting("criteria_menu_id", 4),
            Vec::new(),
        );
        assert!(CriteriaAssembler::apply(&mut query).is_empty());
    }
}

// =============================================================================
// TIER T3: CONTROLLER ROUND TRIP
// =============================================================================

mod t3_controller {
    use super::*;
    use modelquery_core::{
        ControllerDefaults, CrudType, MemoryLocator, QueryController, QueryOutput,
        ReadController, RuntimeContext,
    };

    fn locator() -> MemoryLocator {
        let mut metadata = FieldSet::new();
        metadata.insert(
            "author".to_string(),
            FieldDefinition::new("author", "string").with_default("anonymous"),
        );

        let registry = ModelRegistry::new()
            .with_field(FieldDefinition::new("id", "integer"))
            .with_field(FieldDefinition::new("status", "integer"))
            .with_group("metadata", metadata)
            .with_setting("model_name", "articles")
            .with_setting("criteria_status", "1");

        let rows = vec![
            record(json!({"status": "1", "id": "2", "metadata": "{\"author\": \"amy\"}"})),
            record(json!({"id": 3, "status": 1})),
        ];

        let mut locator = MemoryLocator::new();
        locator.register("Articles", registry, rows);
        locator
    }

    /// T3.1: Resolve, read with criteria, shape.
    #[test]
    fn read_and_shape() {
        let mut controller =
            QueryController::resolve(&locator(), "Articles", "read", &RuntimeContext::default())
                .expect("resolve");
        controller
            .apply_defaults(&ControllerDefaults::default())
            .set_query_object("list")
            .set_get_customfields(true);

        let output = controller.get_data().expect("read");
        assert_eq!(
            controller.executed_sql(),
            Some("SELECT a.* FROM articles AS a WHERE a.status IN ('1')")
        );

        let shaped = controller
            .shape_rows(output.rows(), &TypeSanitizer)
            .expect("shape");

        assert_eq!(shaped.len(), 2);
        assert_eq!(
            shaped[0].to_json(),
            json!({"id": 2, "metadata": {"author": "amy"}, "status": 1})
        );
        assert!(matches!(
            shaped[1].get("metadata"),
            Some(ResultValue::Group(group)) if group.scalar("author") == Some(&json!("anonymous"))
        ));
    }

    /// T3.2: Unknown namespaces surface as runtime errors.
    #[test]
    fn unknown_namespace() {
        let err = QueryController::resolve(&locator(), "Menus", "read", &RuntimeContext::default())
            .expect_err("must fail");
        assert_eq!(err, QueryError::Runtime("Resource not found: Menus".to_string()));
    }

    /// T3.3: Explicit SQL skips the standard criteria.
    #[test]
    fn explicit_sql_skips_criteria() {
        let mut controller =
            QueryController::resolve(&locator(), "Articles", "read", &RuntimeContext::default())
                .expect("resolve");

        controller
            .run_query(CrudType::Read, Some("SELECT * FROM articles"), true)
            .expect("read");

        assert!(controller.query().where_clauses().is_empty());
        assert_eq!(controller.executed_sql(), Some("SELECT * FROM articles"));
    }

    /// T3.4: Malformed CRUD names fall back to read.
    #[test]
    fn lenient_crud_type() {
        let controller =
            QueryController::resolve(&locator(), "Articles", "bogus", &RuntimeContext::default())
                .expect("resolve");
        assert_eq!(
            controller.model_registry().get("crud_type"),
            Some(&json!(CrudType::Read.as_str()))
        );
    }

    /// T3.5: Write failures become runtime errors.
    #[test]
    fn write_without_sql_fails() {
        let mut controller =
            QueryController::resolve(&locator(), "Articles", "update", &RuntimeContext::default())
                .expect("resolve");

        let err = controller
            .run_query(CrudType::Update, None, false)
            .expect_err("must fail");
        assert!(matches!(err, QueryError::Runtime(_)));

        let output = controller
            .run_query(CrudType::Update, Some("UPDATE articles SET status = 0"), false)
            .expect("update");
        assert_eq!(output, QueryOutput::Affected(2));
    }
}
