//! # CLI Tests
//!
//! Argument parsing and command helpers, run against files in a temp dir.

use clap::Parser;
use modelquery::cli::{
    Cli, Commands, RegistryAction, RunOptions, apply_registry_action, load_records,
    load_registry, preview_criteria, run_model, shape_records,
};
use modelquery_core::{CrudType, RedbRegistry, Registry};
use serde_json::json;
use std::path::PathBuf;
use tempfile::{TempDir, tempdir};

const ARTICLES: &str = r#"
criteria_status = "1,2"
criteria_menu_id = 4
customfieldgroups = ["metadata"]

[fields.id]
name = "id"
type = "integer"

[fields.status]
name = "status"
type = "string"

[fields.menu_id]
name = "menu_id"
type = "integer"

[groups.metadata.author]
name = "author"
default = "anonymous"
"#;

const ROWS: &str = r#"[
    {"status": "1", "id": "10", "menu_id": 4, "metadata": "{\"author\": \"amy\"}"},
    {"id": 11, "status": "2", "menu_id": "4"}
]"#;

fn fixture() -> (TempDir, PathBuf, PathBuf) {
    let temp = tempdir().expect("temp dir");
    let registry = temp.path().join("articles.toml");
    let records = temp.path().join("rows.json");
    std::fs::write(&registry, ARTICLES).expect("write registry");
    std::fs::write(&records, ROWS).expect("write rows");
    (temp, registry, records)
}

// =============================================================================
// ARGUMENT PARSING
// =============================================================================

#[test]
fn parses_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "modelquery",
        "criteria",
        "--registry",
        "articles.toml",
        "--json-mode",
        "-q",
    ])
    .expect("parse");

    assert!(cli.json_mode);
    assert!(cli.quiet);
    assert_eq!(cli.database, PathBuf::from("modelquery.redb"));
    assert!(matches!(cli.command, Commands::Criteria { .. }));
}

#[test]
fn parses_registry_actions() {
    let cli = Cli::try_parse_from([
        "modelquery",
        "-D",
        "store.redb",
        "registry",
        "set",
        "--name",
        "articles",
        "--key",
        "criteria_status",
        "--value",
        "1,2",
    ])
    .expect("parse");

    assert_eq!(cli.database, PathBuf::from("store.redb"));
    match cli.command {
        Commands::Registry {
            action: RegistryAction::Set { name, key, value },
        } => {
            assert_eq!(name, "articles");
            assert_eq!(key, "criteria_status");
            assert_eq!(value, "1,2");
        }
        other => unreachable!("unexpected command: {:?}", other),
    }
}

#[test]
fn run_defaults() {
    let cli = Cli::try_parse_from(["modelquery", "run", "--registry", "a.toml"]).expect("parse");
    match cli.command {
        Commands::Run {
            crud,
            sql,
            no_criteria,
            query_object,
            records,
            ..
        } => {
            assert_eq!(crud, "read");
            assert!(sql.is_none());
            assert!(!no_criteria);
            assert_eq!(query_object, "list");
            assert!(records.is_none());
        }
        other => unreachable!("unexpected command: {:?}", other),
    }
}

// =============================================================================
// COMMAND HELPERS
// =============================================================================

#[test]
fn registry_files_take_model_name_from_stem() {
    let (_temp, registry, _) = fixture();
    let model = load_registry(&registry).expect("load");
    assert_eq!(model.get("model_name"), Some(&json!("articles")));
    assert_eq!(model.fields.len(), 3);
}

#[test]
fn missing_files_are_rejected() {
    let temp = tempdir().expect("temp dir");
    assert!(load_registry(&temp.path().join("absent.toml")).is_err());
    assert!(load_records(temp.path()).is_err());
}

#[test]
fn shape_expands_groups() {
    let (_temp, registry, records) = fixture();
    let model = load_registry(&registry).expect("load");
    let rows = load_records(&records).expect("rows");

    let shaped = shape_records(&model, &rows, true, true).expect("shape");
    assert_eq!(
        shaped,
        json!([
            {"id": 10, "menu_id": 4, "metadata": {"author": "amy"}, "status": "1"},
            {"id": 11, "menu_id": 4, "metadata": {"author": "anonymous"}, "status": "2"}
        ])
    );

    let plain = shape_records(&model, &rows, false, true).expect("shape");
    assert_eq!(plain[0].get("metadata"), None);
}

#[test]
fn criteria_preview_lists_clauses_and_query() {
    let (_temp, registry, _) = fixture();
    let report = preview_criteria(&load_registry(&registry).expect("load"));

    assert_eq!(report["clauses"], json!(["a.menu_id = 4", "a.status IN ('1','2')"]));
    assert_eq!(
        report["query"],
        json!("SELECT a.* FROM articles AS a WHERE a.menu_id = 4 AND a.status IN ('1','2')")
    );
}

#[test]
fn run_reads_and_shapes() {
    let (_temp, registry, records) = fixture();
    let report = run_model(
        load_registry(&registry).expect("load"),
        load_records(&records).expect("rows"),
        &RunOptions::default(),
    )
    .expect("run");

    assert_eq!(report.crud_type, CrudType::Read);
    assert_eq!(
        report.sql.as_deref(),
        Some("SELECT a.* FROM articles AS a WHERE a.menu_id = 4 AND a.status IN ('1','2')")
    );
    let rows = report.rows.expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["metadata"], json!({"author": "anonymous"}));
}

#[test]
fn run_insert_reports_id() {
    let (_temp, registry, _) = fixture();
    let options = RunOptions {
        crud_type: "CREATE".to_string(),
        sql: Some("INSERT INTO articles (id) VALUES (12)".to_string()),
        ..RunOptions::default()
    };

    let report = run_model(load_registry(&registry).expect("load"), Vec::new(), &options)
        .expect("run");
    assert_eq!(report.crud_type, CrudType::Create);
    assert_eq!(report.insert_id, Some(1));
    assert!(report.rows.is_none());
}

#[test]
fn run_delete_without_sql_fails() {
    let (_temp, registry, _) = fixture();
    let options = RunOptions {
        crud_type: "delete".to_string(),
        ..RunOptions::default()
    };
    assert!(run_model(load_registry(&registry).expect("load"), Vec::new(), &options).is_err());
}

#[test]
fn registry_import_persists_model() {
    let (temp, registry, _) = fixture();
    let db_path = temp.path().join("store.redb");

    {
        let mut store = RedbRegistry::open(&db_path).expect("open");
        let report = apply_registry_action(
            &mut store,
            RegistryAction::Import {
                name: "Articles".to_string(),
                registry: registry.clone(),
            },
        )
        .expect("import");
        assert_eq!(report["fields"], json!(3));
    }

    let store = RedbRegistry::open(&db_path).expect("reopen");
    let model = store.load_model("articles").expect("load").expect("present");
    assert_eq!(model, load_registry(&registry).expect("load"));
}

#[test]
fn registry_reimport_drops_removed_settings() {
    let (temp, registry, _) = fixture();
    let db_path = temp.path().join("store.redb");
    let import = || RegistryAction::Import {
        name: "articles".to_string(),
        registry: registry.clone(),
    };

    let mut store = RedbRegistry::open(&db_path).expect("open");
    apply_registry_action(&mut store, import()).expect("import");

    let trimmed = ARTICLES.replace("criteria_status = \"1,2\"\n", "");
    std::fs::write(&registry, trimmed).expect("rewrite registry");
    apply_registry_action(&mut store, import()).expect("reimport");

    let model = store.load_model("articles").expect("load").expect("present");
    assert_eq!(model, load_registry(&registry).expect("load"));
    assert_eq!(model.get("criteria_status"), None);
    assert_eq!(preview_criteria(&model)["clauses"], json!(["a.menu_id = 4"]));
}

#[test]
fn registry_sort_orders_keys() {
    let temp = tempdir().expect("temp dir");
    let mut store = RedbRegistry::open(temp.path().join("store.redb")).expect("open");

    for (key, value) in [("zeta", "1"), ("alpha", "[2]"), ("mid", "three")] {
        apply_registry_action(
            &mut store,
            RegistryAction::Set {
                name: "r".to_string(),
                key: key.to_string(),
                value: value.to_string(),
            },
        )
        .expect("set");
    }

    let sorted = apply_registry_action(&mut store, RegistryAction::Sort { name: "r".to_string() })
        .expect("sort");
    let keys: Vec<&String> = sorted.as_object().expect("object").keys().collect();
    assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    assert_eq!(sorted["alpha"], json!([2]));
    assert_eq!(sorted["mid"], json!("three"));

    assert!(
        apply_registry_action(&mut store, RegistryAction::Sort { name: "missing".to_string() })
            .is_err()
    );
}
