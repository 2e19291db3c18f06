//! # Primitives
//!
//! Fixed names and limits shared by the field processor, the criteria
//! assembler and the registry store.
//!
//! These values are compiled into the binary and are immutable at runtime.

// =============================================================================
// FIELD DEFINITIONS
// =============================================================================

/// Data type assumed when a field definition declares none.
pub const DEFAULT_FIELD_TYPE: &str = "string";

/// Field type marking a field as a custom-field container.
///
/// Fields of this type are never shaped directly; their content is
/// expanded by the custom field group pass instead.
pub const CUSTOMFIELD_TYPE: &str = "customfield";

// =============================================================================
// QUERY CONTROLLER
// =============================================================================

/// URI scheme used to resolve query objects from a resource locator.
pub const QUERY_URI_SCHEME: &str = "query://";

/// Table alias used for standard criteria when the registry sets none.
pub const DEFAULT_PRIMARY_PREFIX: &str = "a";

/// Query object kind requested when the caller does not pick one.
pub const DEFAULT_QUERY_OBJECT: &str = "item";

/// Registry setting holding the table alias for standard criteria.
pub const PRIMARY_PREFIX_KEY: &str = "primary_prefix";

/// Registry setting holding the query object kind (result, item, list, distinct).
pub const QUERY_OBJECT_KEY: &str = "query_object";

/// Registry flag requesting custom field group expansion.
pub const GET_CUSTOMFIELDS_KEY: &str = "get_customfields";

// =============================================================================
// STANDARD CRITERIA
// =============================================================================

/// Registry setting: catalog type filter (`IN`, integer).
pub const CRITERIA_CATALOG_TYPE_ID: &str = "criteria_catalog_type_id";

/// Registry setting: extension instance filter (`=`, integer).
pub const CRITERIA_EXTENSION_INSTANCE_ID: &str = "criteria_extension_instance_id";

/// Registry setting: menu filter (`=`, integer).
pub const CRITERIA_MENU_ID: &str = "criteria_menu_id";

/// Registry setting: status filter (`IN`, string).
pub const CRITERIA_STATUS: &str = "criteria_status";

// =============================================================================
// REGISTRY STORE FORMAT
// =============================================================================

/// Magic bytes prefixed to every stored registry value.
pub const MAGIC_BYTES: &[u8; 4] = b"MQRV";

/// Current registry value format version.
///
/// Increment this when making breaking changes to the stored value layout.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum encoded size of a single stored registry value (16 MB).
pub const MAX_STORED_VALUE_SIZE: usize = 16 * 1024 * 1024;

/// Maximum length of a registry name or key.
pub const MAX_REGISTRY_KEY_LENGTH: usize = 256;
