//! # Model Configuration
//!
//! Loading `ModelRegistry` documents.
//!
//! Registries are TOML documents: top-level keys are registry settings,
//! `[fields.<key>]` tables are field definitions, and
//! `[groups.<group>.<key>]` tables are the field definitions of each
//! custom field group listed in `customfieldgroups`.
//!
//! ```toml
//! primary_prefix = "a"
//! criteria_status = "1,2"
//! customfieldgroups = ["metadata"]
//!
//! [fields.title]
//! name = "title"
//! type = "string"
//!
//! [groups.metadata.author]
//! name = "author"
//! default = "anonymous"
//! ```

use crate::{ModelRegistry, QueryError};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Produces the registry for a model.
pub trait ConfigurationSource {
    /// Load the registry of `model_name` of kind `model_type`.
    ///
    /// When `document` is given it is parsed directly; otherwise the
    /// source locates the document itself.
    fn configuration(
        &self,
        model_type: &str,
        model_name: &str,
        document: Option<&str>,
    ) -> Result<ModelRegistry, QueryError>;
}

/// Reads registries from TOML files laid out as
/// `<root>/<model_type>/<model_name>.toml`.
#[derive(Debug, Clone, Default)]
pub struct TomlConfiguration {
    root: Option<PathBuf>,
}

impl TomlConfiguration {
    /// A source that only accepts inline documents.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A source rooted at `root`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Parse a registry document.
    pub fn parse(document: &str) -> Result<ModelRegistry, QueryError> {
        toml::from_str(document).map_err(|e| QueryError::Configuration(e.to_string()))
    }

    /// Parse a registry file.
    pub fn load_file(path: &Path) -> Result<ModelRegistry, QueryError> {
        let document = std::fs::read_to_string(path).map_err(|e| {
            QueryError::Configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&document)
    }

    fn path_for(&self, model_type: &str, model_name: &str) -> Result<PathBuf, QueryError> {
        let root = self.root.as_ref().ok_or_else(|| {
            QueryError::Configuration(format!(
                "No document given for {}/{} and no configuration root set",
                model_type, model_name
            ))
        })?;

        let is_plain = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        };
        if !is_plain(model_type) || !is_plain(model_name) {
            return Err(QueryError::Configuration(format!(
                "Invalid model reference: {}/{}",
                model_type, model_name
            )));
        }

        Ok(root.join(model_type).join(format!("{}.toml", model_name)))
    }
}

impl ConfigurationSource for TomlConfiguration {
    /// The loaded registry records `model_type` and `model_name` unless the
    /// document sets them itself.
    fn configuration(
        &self,
        model_type: &str,
        model_name: &str,
        document: Option<&str>,
    ) -> Result<ModelRegistry, QueryError> {
        let mut registry = match document {
            Some(text) => Self::parse(text)?,
            None => Self::load_file(&self.path_for(model_type, model_name)?)?,
        };

        if registry.get("model_type").is_none() {
            registry.set("model_type", Value::from(model_type));
        }
        if registry.get("model_name").is_none() {
            registry.set("model_name", Value::from(model_name));
        }

        tracing::debug!(
            model_type,
            model_name,
            fields = registry.fields.len(),
            groups = registry.customfieldgroups.len(),
            "model registry loaded"
        );

        Ok(registry)
    }
}

// =============================================================================
// TESTS
// =============================================================================
