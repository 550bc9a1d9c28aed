//! Payloads exchanged with the editing surface.

use crate::element::ElementKind;
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// One entry of a selection catalog.
#[derive(Debug, Clone, PartialEq, Eq, SerdeSerialize, SerdeDeserialize)]
pub struct SelectOption {
    /// Display label.
    pub key: String,
    /// Stored value.
    pub value: String,
}

impl SelectOption {
    /// Create a new option.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Editor payload of a single relation.
///
/// Missing `id` or `type` means "no value".
#[derive(Debug, Clone, PartialEq, Default, SerdeSerialize, SerdeDeserialize)]
pub struct RelationPayload {
    /// Element id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Full path of the element.
    #[serde(default)]
    pub path: String,
    /// Concrete subtype (e.g. `image`, `page`, `object`).
    #[serde(default)]
    pub subtype: String,
    /// Element kind.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ElementKind>,
    /// Whether the element is published.
    #[serde(default)]
    pub published: bool,
}

/// Grid payload of a field whose options come from a dynamic provider.
#[derive(Debug, Clone, PartialEq, SerdeSerialize, SerdeDeserialize)]
pub struct GridPayload {
    /// Editor value.
    pub value: Option<String>,
    /// Options resolved for this row.
    pub options: Vec<SelectOption>,
}

/// A value as sent to or received from the editor.
#[derive(Debug, Clone, PartialEq, SerdeSerialize, SerdeDeserialize)]
#[serde(untagged)]
pub enum EditorValue {
    /// No value.
    Null,
    /// Grid payload with per-row options.
    Grid(GridPayload),
    /// Relation payload.
    Relation(RelationPayload),
    /// Plain text (scalars, comma-joined multiselect).
    Text(String),
    /// Number.
    Number(f64),
}

impl EditorValue {
    /// Check if this payload carries no value.
    pub fn is_null(&self) -> bool {
        matches!(self, EditorValue::Null)
    }
}
