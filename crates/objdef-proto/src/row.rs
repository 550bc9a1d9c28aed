//! Stored row shapes handed to and from the persistence adapter.

use crate::element::{ElementKind, ElementRef};
use crate::error::Error;
use crate::value::Value;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// One named column value.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct ColumnValue {
    /// Column name.
    pub name: String,
    /// Column value.
    pub value: Value,
}

impl ColumnValue {
    /// Create a new column value.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// The scalar part of an object as persisted: storage columns plus the
/// denormalized query columns.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Default,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub struct StoredRow {
    /// Canonical storage columns.
    pub columns: Vec<ColumnValue>,
    /// Query (search/filter) columns.
    pub query_columns: Vec<ColumnValue>,
}

impl StoredRow {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a storage column by name.
    pub fn column(&self, name: &str) -> Option<&Value> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.value)
    }

    /// Get a query column by name.
    pub fn query_column(&self, name: &str) -> Option<&Value> {
        self.query_columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.value)
    }

    /// Serialize the row to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a row from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// Which kind of container owns a relation row.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    /// Field of the object itself.
    Object,
    /// Field inside an object brick.
    Objectbrick,
    /// Field inside a field collection item.
    Fieldcollection,
    /// Localized field.
    Localizedfield,
}

/// One row of the relation table.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct RelationRow {
    /// Owning field name.
    pub field_name: String,
    /// Referenced element id.
    pub dest_id: u64,
    /// Referenced element kind.
    pub kind: ElementKind,
    /// Owner container type.
    pub owner_type: OwnerType,
    /// Ordinal within the field (always 0 for single relations).
    pub position: u32,
}

impl RelationRow {
    /// Create a row for an object-level field.
    pub fn new(field_name: impl Into<String>, target: ElementRef) -> Self {
        Self {
            field_name: field_name.into(),
            dest_id: target.id,
            kind: target.kind,
            owner_type: OwnerType::Object,
            position: 0,
        }
    }

    /// Set the owner type.
    pub fn with_owner_type(mut self, owner_type: OwnerType) -> Self {
        self.owner_type = owner_type;
        self
    }

    /// The referenced element.
    pub fn target(&self) -> ElementRef {
        ElementRef::new(self.kind, self.dest_id)
    }
}

/// Relation rows of one owner, as stored.
#[derive(Debug, Clone, PartialEq, Default, Archive, Serialize, Deserialize)]
pub struct RelationRows {
    /// The rows.
    pub rows: Vec<RelationRow>,
}

impl RelationRows {
    /// Serialize the rows to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize rows from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}
