//! Field types.
//!
//! Every attribute kind implements [`FieldType`], the contract that moves a
//! value between its in-memory form ([`FieldValue`]) and the other
//! representations: storage, query columns, editor payloads, previews and
//! exports. Behavior only some kinds have is split into capability traits:
//!
//! - [`Normalizable`] - JSON normal form
//! - [`LazyLoadable`] - load on first read, guarded by the container's flag
//! - [`IdRewriter`] - remap referenced ids after import/clone
//! - [`SetAlgebra`] - append/remove for multi-value fields
//! - [`DefinitionHooks`] - definition-save checks and master synchronization

mod dependency;
mod multiselect;
mod relation;
mod scalar;

pub use dependency::{rewrite_reference, Dependencies, DependencyRecord, IdMapping};
pub use multiselect::{Multiselect, MULTISELECT_DELIMITER};
pub use relation::ManyToOneRelation;
pub use scalar::{Input, Numeric, DEFAULT_INPUT_COLUMN_LENGTH};

use std::collections::BTreeMap;

use objdef_proto::{Condition, EditorValue, FilterRequest, RelationRow, Value};
use serde::{Deserialize, Serialize};

use crate::catalog::OptionsProviderRegistry;
use crate::config::RequestContext;
use crate::container::Container;
use crate::element::{Element, ElementResolver};
use crate::error::{Result, ValidationError};
use crate::query::ConditionBuilder;
use crate::storage::PersistenceAdapter;

/// In-memory value of a field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    /// Absent.
    #[default]
    Null,
    /// A scalar.
    Scalar(Value),
    /// Selected option values of a multi-value field.
    List(Vec<String>),
    /// A resolved element.
    Element(Element),
}

impl FieldValue {
    /// Text scalar.
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Scalar(Value::String(s.into()))
    }

    /// Option list.
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::List(values.into_iter().map(Into::into).collect())
    }

    /// Check if this value is absent.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Null, an empty scalar or an empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Scalar(v) => v.is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Element(_) => false,
        }
    }

    /// Try to get as a resolved element.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            FieldValue::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Try to get as an option list.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get as a scalar.
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Element> for FieldValue {
    fn from(e: Element) -> Self {
        FieldValue::Element(e)
    }
}

impl From<Option<Element>> for FieldValue {
    fn from(e: Option<Element>) -> Self {
        e.map(FieldValue::Element).unwrap_or(FieldValue::Null)
    }
}

/// Storage representation of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageValue {
    /// A single storage column.
    Column(Value),
    /// Rows of the relation table.
    Relations(Vec<RelationRow>),
}

impl StorageValue {
    /// Check if nothing is stored.
    pub fn is_empty(&self) -> bool {
        match self {
            StorageValue::Column(v) => v.is_empty(),
            StorageValue::Relations(rows) => rows.is_empty(),
        }
    }
}

/// Result of decoding a storage representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    /// Decoded value.
    pub value: FieldValue,
    /// Stored state referenced something that no longer exists.
    pub dirty: bool,
}

impl Loaded {
    /// A clean load.
    pub fn clean(value: FieldValue) -> Self {
        Self {
            value,
            dirty: false,
        }
    }

    /// A load that dropped a dangling reference.
    pub fn dangling() -> Self {
        Self {
            value: FieldValue::Null,
            dirty: true,
        }
    }
}

/// Collaborators needed while decoding values.
#[derive(Clone, Copy)]
pub struct FieldContext<'a> {
    /// Relation resolution service.
    pub resolver: &'a dyn ElementResolver,
    /// Request-scoped settings.
    pub request: &'a RequestContext,
}

impl<'a> FieldContext<'a> {
    /// Create a context.
    pub fn new(resolver: &'a dyn ElementResolver, request: &'a RequestContext) -> Self {
        Self { resolver, request }
    }
}

/// Physical column declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    /// Column name.
    pub name: String,
    /// SQL column type.
    pub sql_type: String,
}

impl ColumnType {
    /// Create a column declaration.
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }
}

/// The contract every field type implements.
pub trait FieldType {
    /// Field name.
    fn name(&self) -> &str;

    /// Fieldtype tag.
    fn fieldtype(&self) -> &'static str;

    /// Whether a value is required.
    fn is_mandatory(&self) -> bool;

    /// Encode for a low-level write.
    fn encode_for_storage(&self, value: &FieldValue) -> Result<StorageValue>;

    /// Decode what [`FieldType::encode_for_storage`] produced, including legacy
    /// and empty forms.
    fn decode_from_storage(&self, stored: &StorageValue, ctx: &FieldContext<'_>)
        -> Result<Loaded>;

    /// Query column values keyed by column name.
    fn encode_for_query(&self, value: &FieldValue) -> Result<BTreeMap<String, Value>>;

    /// Editor payload.
    fn encode_for_editor(&self, value: &FieldValue) -> EditorValue;

    /// Value from an editor payload.
    fn decode_from_editor(&self, payload: &EditorValue, ctx: &FieldContext<'_>)
        -> Result<FieldValue>;

    /// Value from a grid editor payload.
    fn decode_from_grid_editor(
        &self,
        payload: &EditorValue,
        ctx: &FieldContext<'_>,
    ) -> Result<FieldValue> {
        self.decode_from_editor(payload, ctx)
    }

    /// Check the value against the definition.
    fn validate(&self, value: &FieldValue, skip_mandatory: bool) -> std::result::Result<(), ValidationError>;

    /// HTML-escaped human-readable rendering; empty when unsupported.
    fn preview(&self, value: &FieldValue) -> String;

    /// Semantic equality.
    fn is_equal(&self, a: &FieldValue, b: &FieldValue) -> bool;

    /// Filter fragment for a request on this field.
    fn build_filter_condition(
        &self,
        request: &FilterRequest,
        class_name: &str,
        builder: &ConditionBuilder,
    ) -> Result<Condition>;

    /// CSV export cell.
    fn csv_export(&self, value: &FieldValue) -> String;

    /// Search index text.
    fn search_index(&self, _value: &FieldValue) -> String {
        String::new()
    }

    /// Elements this value depends on.
    fn resolve_dependencies(&self, _value: &FieldValue) -> Dependencies {
        Dependencies::new()
    }

    /// Storage column declarations (empty when stored in the relation table).
    fn column_types(&self) -> Vec<ColumnType>;

    /// Query column declarations.
    fn query_column_types(&self) -> Vec<ColumnType>;

    /// Whether the field can be filtered on.
    fn is_filterable(&self) -> bool {
        false
    }

    /// Whether partial (diff) changes can be applied to the field.
    fn is_diff_change_allowed(&self) -> bool {
        false
    }

    /// Whether values live in the relation table.
    fn is_relation_type(&self) -> bool {
        false
    }
}

/// JSON normal form of values.
pub trait Normalizable {
    /// Value to JSON.
    fn normalize(&self, value: &FieldValue) -> serde_json::Value;

    /// JSON to value.
    fn denormalize(&self, value: &serde_json::Value, ctx: &FieldContext<'_>) -> Result<FieldValue>;
}

/// Fields fetched on first read.
pub trait LazyLoadable {
    /// Fetch and decode the field unless the container already has it.
    fn load_lazy(
        &self,
        container: &mut dyn Container,
        ctx: &FieldContext<'_>,
        store: &dyn PersistenceAdapter,
    ) -> Result<()>;

    /// Read hook: lazy load, then apply visibility rules.
    fn pre_get_data(
        &self,
        container: &mut dyn Container,
        ctx: &FieldContext<'_>,
        store: &dyn PersistenceAdapter,
    ) -> Result<FieldValue>;

    /// Write hook: an explicitly set value counts as loaded.
    fn pre_set_data(&self, container: &mut dyn Container, value: FieldValue) -> FieldValue;
}

/// Remapping of referenced ids.
pub trait IdRewriter {
    /// Rewrite the container's current value of this field.
    fn rewrite_ids(
        &self,
        container: &dyn Container,
        mapping: &IdMapping,
        ctx: &FieldContext<'_>,
    ) -> FieldValue;
}

/// Set operations of multi-value fields.
pub trait SetAlgebra {
    /// Union, deduplicated.
    fn append_values(&self, existing: &FieldValue, additional: &[String]) -> FieldValue;

    /// Difference, deduplicated.
    fn remove_values(&self, existing: &FieldValue, remove: &[String]) -> FieldValue;
}

/// Definition-level hooks.
pub trait DefinitionHooks {
    /// Checks run before the definition is persisted.
    fn pre_save(&self, providers: &OptionsProviderRegistry) -> Result<()>;

    /// Copy shared settings from the master definition.
    fn synchronize_with_master(&mut self, master: &Self);
}

/// Shared mandatory check.
pub fn check_mandatory<F: FieldType + ?Sized>(
    field: &F,
    value: &FieldValue,
    skip_mandatory: bool,
) -> std::result::Result<(), ValidationError> {
    if !skip_mandatory && field.is_mandatory() && value.is_empty() {
        return Err(ValidationError::empty_mandatory(field.name(), field.fieldtype()));
    }
    Ok(())
}

/// Escape text for embedding in HTML.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_emptiness() {
        assert!(FieldValue::Null.is_empty());
        assert!(FieldValue::text("").is_empty());
        assert!(FieldValue::List(vec![]).is_empty());
        assert!(!FieldValue::list(["red"]).is_empty());
        assert!(!FieldValue::from(Element::asset(1, "/a", "image")).is_empty());
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"Tom\" & 'Jerry'</b>"), "&lt;b&gt;&quot;Tom&quot; &amp; &#039;Jerry&#039;&lt;/b&gt;");
        assert_eq!(escape_html("plain"), "plain");
    }
}
