//! # CLI Command Implementations
//!
//! Each `cmd_*` function reads its inputs, delegates to a pure helper that
//! returns a JSON report, and prints the report. The helpers are public so
//! they can be tested without touching stdout.

use modelquery_core::{
    ConfigurationSource, ControllerDefaults, CriteriaAssembler, CrudType, FieldProcessor,
    FieldSanitizer, MemoryLocator, MemoryQuery, ModelRegistry, PassthroughSanitizer, QueryBuilder,
    QueryController, QueryError, QueryObject, QueryOutput, Record, RedbRegistry, Registry,
    RuntimeContext, TomlConfiguration, TypeSanitizer, types::text_value,
};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::RegistryAction;

// =============================================================================
// INPUT VALIDATION
// =============================================================================

/// Maximum size of a registry or records file (100 MB).
const MAX_INPUT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Namespace used when a registry does not name its model.
const DEFAULT_NAMESPACE: &str = "model";

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), QueryError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| QueryError::Storage(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(QueryError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and make sure it names a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, QueryError> {
    let canonical = path.canonicalize().map_err(|e| {
        QueryError::Storage(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(QueryError::Storage(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

fn read_input(path: &Path) -> Result<String, QueryError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_INPUT_FILE_SIZE)?;
    std::fs::read_to_string(&validated)
        .map_err(|e| QueryError::Storage(format!("Read file: {}", e)))
}

// =============================================================================
// INPUT LOADING
// =============================================================================

/// Load a model registry document. The model name defaults to the file stem.
pub fn load_registry(path: &Path) -> Result<ModelRegistry, QueryError> {
    let document = read_input(path)?;
    let model_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

    TomlConfiguration::new().configuration("file", &model_name, Some(&document))
}

/// Load records from a JSON document holding one object or an array of
/// objects.
pub fn load_records(path: &Path) -> Result<Vec<Record>, QueryError> {
    parse_records(&read_input(path)?)
}

/// Parse records from JSON text.
pub fn parse_records(text: &str) -> Result<Vec<Record>, QueryError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| QueryError::Serialization(format!("Invalid records: {}", e)))?;

    match value {
        Value::Object(record) => Ok(vec![record]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(record) => Ok(record),
                _ => Err(QueryError::Serialization(format!(
                    "Record {} is not an object",
                    index
                ))),
            })
            .collect(),
        _ => Err(QueryError::Serialization(
            "Records must be an object or an array of objects".to_string(),
        )),
    }
}

/// Interpret a command-line value as JSON, falling back to plain text.
pub fn parse_entry_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_json(value: &Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// SHAPE COMMAND
// =============================================================================

/// Shape every record against `registry`.
pub fn shape_records(
    registry: &ModelRegistry,
    records: &[Record],
    include_custom: bool,
    typed: bool,
) -> Result<Value, QueryError> {
    let sanitizer: &dyn FieldSanitizer = if typed {
        &TypeSanitizer
    } else {
        &PassthroughSanitizer
    };
    let processor = FieldProcessor::new(sanitizer);

    let shaped = records
        .iter()
        .map(|record| {
            processor
                .shape(record, registry, include_custom)
                .map(|object| object.to_json())
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Value::Array(shaped))
}

/// Shape records from a file and print them.
pub fn cmd_shape(
    registry: &Path,
    records: &Path,
    include_custom: bool,
    typed: bool,
) -> Result<(), QueryError> {
    let registry = load_registry(registry)?;
    let records = load_records(records)?;
    tracing::info!(records = records.len(), "shaping records");

    print_json(&shape_records(&registry, &records, include_custom, typed)?);
    Ok(())
}

// =============================================================================
// CRITERIA COMMAND
// =============================================================================

/// Apply the standard criteria to an empty query over `registry`.
pub fn preview_criteria(registry: &ModelRegistry) -> Value {
    let mut query = MemoryQuery::new(registry.clone(), Vec::new());
    let clauses: Vec<Value> = CriteriaAssembler::apply(&mut query)
        .iter()
        .map(|clause| Value::String(clause.to_string()))
        .collect();

    serde_json::json!({
        "clauses": clauses,
        "query": query.query_string(),
    })
}

/// Print the standard criteria of a model.
pub fn cmd_criteria(registry: &Path, json_mode: bool) -> Result<(), QueryError> {
    let report = preview_criteria(&load_registry(registry)?);

    if json_mode {
        print_json(&report);
        return Ok(());
    }

    println!("Standard Criteria");
    println!("=================");
    match report["clauses"].as_array() {
        Some(clauses) if !clauses.is_empty() => {
            for clause in clauses {
                println!("  {}", text_value(clause));
            }
        }
        _ => println!("  (none)"),
    }
    println!();
    println!("Query: {}", text_value(&report["query"]));

    Ok(())
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Options of a controller run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub crud_type: String,
    pub sql: Option<String>,
    pub standard_criteria: bool,
    pub query_object: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            crud_type: CrudType::Read.as_str().to_string(),
            sql: None,
            standard_criteria: true,
            query_object: "list".to_string(),
        }
    }
}

/// What a controller run produced.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub crud_type: CrudType,
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_id: Option<u64>,
}

/// Resolve `registry` through a locator, run one operation and shape any
/// returned rows.
pub fn run_model(
    registry: ModelRegistry,
    rows: Vec<Record>,
    options: &RunOptions,
) -> Result<RunReport, QueryError> {
    let namespace = registry
        .get("model_name")
        .map(text_value)
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
    let has_groups = !registry.customfieldgroups.is_empty();

    let mut locator = MemoryLocator::new();
    locator.register(namespace.clone(), registry, rows);

    let mut controller = QueryController::resolve(
        &locator,
        &namespace,
        &options.crud_type,
        &RuntimeContext::default(),
    )?;
    controller.apply_defaults(&ControllerDefaults {
        query_object: options.query_object.clone(),
        get_customfields: has_groups,
        ..ControllerDefaults::default()
    });

    let crud_type = CrudType::parse_lenient(&options.crud_type);
    let output = controller.run_query(crud_type, options.sql.as_deref(), options.standard_criteria)?;

    let mut report = RunReport {
        crud_type,
        sql: controller.executed_sql().map(str::to_string),
        rows: None,
        value: None,
        affected: None,
        insert_id: None,
    };

    match output {
        QueryOutput::Rows(rows) => {
            let shaped = controller.shape_rows(&rows, &TypeSanitizer)?;
            report.rows = Some(shaped.iter().map(|object| object.to_json()).collect());
        }
        QueryOutput::Value(value) => report.value = Some(value),
        QueryOutput::Affected(count) => report.affected = Some(count),
        QueryOutput::InsertId(id) => report.insert_id = Some(id),
    }

    tracing::info!(
        crud_type = %report.crud_type,
        clauses = controller.query().where_clauses().len(),
        "query finished"
    );

    Ok(report)
}

/// Run one controller operation and print the report.
pub fn cmd_run(
    registry: &Path,
    records: Option<&Path>,
    options: &RunOptions,
) -> Result<(), QueryError> {
    let registry = load_registry(registry)?;
    let rows = match records {
        Some(path) => load_records(path)?,
        None => Vec::new(),
    };

    let report = run_model(registry, rows, options)?;
    let json =
        serde_json::to_value(&report).map_err(|e| QueryError::Serialization(e.to_string()))?;
    print_json(&json);
    Ok(())
}

// =============================================================================
// REGISTRY COMMAND
// =============================================================================

/// Apply one registry action and report the outcome as JSON.
pub fn apply_registry_action(
    store: &mut dyn Registry,
    action: RegistryAction,
) -> Result<Value, QueryError> {
    match action {
        RegistryAction::Set { name, key, value } => {
            let value = parse_entry_value(&value);
            store.set(&name, &key, value.clone())?;
            Ok(serde_json::json!({ "name": name, "key": key, "value": value }))
        }
        RegistryAction::Get { name, key } => Ok(store.get(&name, &key)?.unwrap_or(Value::Null)),
        RegistryAction::List => Ok(Value::from(store.names()?)),
        RegistryAction::Exists { name, key } => Ok(Value::Bool(store.exists(&name, key.as_deref())?)),
        RegistryAction::Sort { name } => {
            let entries = store.sort(&name)?;
            Ok(Value::Object(entries.into_iter().collect()))
        }
        RegistryAction::Import { name, registry } => {
            let model = load_registry(&registry)?;
            store.store_model(&name, &model)?;
            Ok(serde_json::json!({
                "name": name,
                "fields": model.fields.len(),
                "customfieldgroups": model.customfieldgroups.len(),
            }))
        }
    }
}

/// Run a registry action against the redb store at `db_path`.
pub fn cmd_registry(db_path: &Path, json_mode: bool, action: RegistryAction) -> Result<(), QueryError> {
    let mut store = RedbRegistry::open(db_path)?;
    let report = apply_registry_action(&mut store, action)?;

    match &report {
        Value::String(text) if !json_mode => println!("{}", text),
        Value::Object(entries) if !json_mode => {
            for (key, value) in entries {
                println!("{} = {}", key, value);
            }
        }
        Value::Array(items) if !json_mode => {
            for item in items {
                println!("{}", text_value(item));
            }
        }
        _ => print_json(&report),
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
