//! # Field Processor
//!
//! Shapes raw records into key-sorted `ResultObject`s using the field
//! definitions of a `ModelRegistry`.
//!
//! Three passes, leaf first:
//! - Field resolution: default, effective value and effective type of one field
//! - Field set processing: every non-custom field of a set, sanitized
//! - Custom field group expansion: each group's serialized sub-document,
//!   decoded and processed against the group's own field set
//!
//! Output keys always ascend, recursively. Nothing here mutates the
//! registry or the record.

use crate::primitives::{CUSTOMFIELD_TYPE, DEFAULT_FIELD_TYPE};
use crate::sanitize::{FieldSanitizer, ResolvedField};
use crate::types::sort_value;
use crate::{FieldDefinition, FieldSet, ModelRegistry, QueryError, Record, ResultObject, ResultValue};
use serde_json::Value;

/// Shapes records with a borrowed sanitizer.
#[derive(Debug, Clone, Copy)]
pub struct FieldProcessor<'a, S: FieldSanitizer + ?Sized> {
    sanitizer: &'a S,
}

impl<'a, S: FieldSanitizer + ?Sized> FieldProcessor<'a, S> {
    /// Create a processor that sanitizes with `sanitizer`.
    #[must_use]
    pub fn new(sanitizer: &'a S) -> Self {
        Self { sanitizer }
    }

    // =========================================================================
    // FIELD RESOLUTION
    // =========================================================================

    /// Resolve the effective value and type of one field.
    ///
    /// A field missing from the record, or null in it, takes the
    /// definition's default. A missing type is `"string"`.
    #[must_use]
    pub fn resolve(name: &str, definition: &FieldDefinition, record: &Record) -> ResolvedField {
        let default = definition.default.clone().unwrap_or(Value::Null);

        let value = record
            .get(name)
            .filter(|value| !value.is_null())
            .cloned()
            .unwrap_or(default);

        let data_type = definition
            .data_type
            .clone()
            .unwrap_or_else(|| DEFAULT_FIELD_TYPE.to_string());

        ResolvedField {
            name: name.to_string(),
            value,
            data_type,
        }
    }

    // =========================================================================
    // FIELD SET PROCESSING
    // =========================================================================

    /// Shape `record` against `fields`.
    ///
    /// Fields named in `custom_groups`, and fields of type `customfield`,
    /// are skipped. Every other field is resolved and sanitized.
    ///
    /// # Errors
    /// Returns `QueryError::Configuration` naming the registry key of the
    /// first empty or malformed definition.
    pub fn process_fields(
        &self,
        record: &Record,
        fields: &FieldSet,
        custom_groups: &[String],
    ) -> Result<ResultObject, QueryError> {
        let mut base = ResultObject::new();

        for (key, definition) in fields {
            let name = definition.field_name().ok_or_else(|| {
                QueryError::Configuration(format!("Field: {} not defined in field set", key))
            })?;

            if custom_groups.iter().any(|group| group == name)
                || definition.data_type.as_deref() == Some(CUSTOMFIELD_TYPE)
            {
                continue;
            }

            let resolved = Self::resolve(name, definition, record);
            let value = self.sanitizer.sanitize(&resolved)?;
            base.insert(name, ResultValue::Scalar(sort_value(value)));
        }

        Ok(base)
    }

    /// Shape the regular fields of `record` against `registry`.
    pub fn standard_fields(
        &self,
        record: &Record,
        registry: &ModelRegistry,
    ) -> Result<ResultObject, QueryError> {
        self.process_fields(record, &registry.fields, &registry.customfieldgroups)
    }

    // =========================================================================
    // CUSTOM FIELD GROUPS
    // =========================================================================

    /// Attach one shaped sub-object per declared custom field group.
    ///
    /// Groups are processed in declaration order. Returns `base` unchanged
    /// when the registry declares no groups.
    ///
    /// # Errors
    /// Returns `QueryError::Configuration` if a declared group has no field
    /// set in the registry, or if a group field definition is malformed.
    pub fn custom_fields(
        &self,
        mut base: ResultObject,
        record: &Record,
        registry: &ModelRegistry,
    ) -> Result<ResultObject, QueryError> {
        for group in &registry.customfieldgroups {
            let fields = registry.group_fields(group).ok_or_else(|| {
                QueryError::Configuration(format!(
                    "Custom field group: {} has no field definitions",
                    group
                ))
            })?;

            let group_record = decode_group(group, record.get(group));
            let shaped = self.process_fields(&group_record, fields, &registry.customfieldgroups)?;
            base.insert(group.clone(), ResultValue::Group(shaped));
        }

        Ok(base)
    }

    /// Shape a full record: regular fields, then custom groups when
    /// `include_custom` is set.
    pub fn shape(
        &self,
        record: &Record,
        registry: &ModelRegistry,
        include_custom: bool,
    ) -> Result<ResultObject, QueryError> {
        let base = self.standard_fields(record, registry)?;
        if include_custom {
            self.custom_fields(base, record, registry)
        } else {
            Ok(base)
        }
    }
}

/// Decode a custom field group's serialized sub-document.
///
/// Accepts a JSON string or an already-decoded object. Anything else,
/// including undecodable text, yields an empty record so that every
/// group field falls back to its default.
fn decode_group(group: &str, raw: Option<&Value>) -> Record {
    match raw {
        None | Some(Value::Null) => Record::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(text)) if text.trim().is_empty() => Record::new(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                tracing::warn!(group, "custom field document is not an object");
                Record::new()
            }
            Err(e) => {
                tracing::warn!(group, error = %e, "custom field document is not valid JSON");
                Record::new()
            }
        },
        Some(_) => {
            tracing::warn!(group, "custom field document has unsupported type");
            Record::new()
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
