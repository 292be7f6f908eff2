//! Field registry, nested-path resolution, and value formatting.

pub mod format;
pub mod path;
pub mod registry;

pub use format::{
    FormatError, FormattedField, Formatter, OBJECT_MARKER, PLACEHOLDER, UnknownFormatter,
    copy_text, filter_and_search_fields, format_value, format_value_at, formatted_fields,
    is_empty, resolve_and_format, resolve_and_format_at,
};
pub use path::resolve;
pub use registry::{
    FieldDescriptor, FieldGroup, FieldRegistry, RegistryError, ValueType, list_by_group,
    list_critical, list_risk_weighted, lookup,
};
