//! Containers: the holders of named field values.
//!
//! A container owns the current in-memory value of each field plus two pieces
//! of explicit state: which lazily loaded fields have been fetched, and which
//! fields were found dirty while loading (a stored reference that no longer
//! resolves).

use std::collections::{BTreeSet, HashMap, HashSet};

use objdef_proto::OwnerType;

use crate::field::FieldValue;

/// What kind of holder a container is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// The object itself.
    Object,
    /// An object brick attached to the object.
    Brick {
        /// Brick name.
        name: String,
    },
    /// One item of a field collection.
    FieldCollection {
        /// Collection field name.
        name: String,
        /// Item index.
        index: u32,
    },
    /// Localized fields for one language.
    Localized {
        /// Language code.
        language: String,
    },
}

impl ContainerKind {
    /// Relation table owner type for this kind.
    pub fn owner_type(&self) -> OwnerType {
        match self {
            ContainerKind::Object => OwnerType::Object,
            ContainerKind::Brick { .. } => OwnerType::Objectbrick,
            ContainerKind::FieldCollection { .. } => OwnerType::Fieldcollection,
            ContainerKind::Localized { .. } => OwnerType::Localizedfield,
        }
    }

    /// Owner discriminator within the object (brick, collection item, language).
    pub fn owner_name(&self) -> String {
        match self {
            ContainerKind::Object => String::new(),
            ContainerKind::Brick { name } => name.clone(),
            ContainerKind::FieldCollection { name, index } => format!("{}:{}", name, index),
            ContainerKind::Localized { language } => language.clone(),
        }
    }

    /// Localized fields are loaded eagerly with their container.
    pub fn is_localized(&self) -> bool {
        matches!(self, ContainerKind::Localized { .. })
    }
}

/// Minimal contract the field layer needs from a container.
pub trait Container {
    /// Container kind.
    fn kind(&self) -> &ContainerKind;

    /// Class of the owning object.
    fn class_name(&self) -> &str;

    /// Id of the owning object.
    fn object_id(&self) -> u64;

    /// Current value of a field, if any.
    fn get_object_var(&self, name: &str) -> Option<&FieldValue>;

    /// Replace the current value of a field.
    fn set_object_var(&mut self, name: &str, value: FieldValue);

    /// Whether a lazily loaded field has been fetched.
    fn is_lazy_key_loaded(&self, name: &str) -> bool;

    /// Mark a lazily loaded field as fetched.
    fn mark_lazy_key_loaded(&mut self, name: &str);

    /// Flag a field whose stored state must be rewritten on the next save.
    fn mark_field_dirty(&mut self, name: &str);

    /// Whether a field is flagged dirty.
    fn is_field_dirty(&self, name: &str) -> bool;

    /// Whether any field is flagged dirty.
    fn is_dirty(&self) -> bool;

    /// Clear all dirty flags.
    fn clear_dirty(&mut self);
}

/// Standard in-memory container.
#[derive(Debug, Clone)]
pub struct ObjectContainer {
    class_name: String,
    object_id: u64,
    kind: ContainerKind,
    values: HashMap<String, FieldValue>,
    loaded: HashSet<String>,
    dirty: BTreeSet<String>,
}

impl ObjectContainer {
    /// Create an object container.
    pub fn new(class_name: impl Into<String>, object_id: u64) -> Self {
        Self::with_kind(class_name, object_id, ContainerKind::Object)
    }

    /// Create a container of any kind.
    pub fn with_kind(class_name: impl Into<String>, object_id: u64, kind: ContainerKind) -> Self {
        Self {
            class_name: class_name.into(),
            object_id,
            kind,
            values: HashMap::new(),
            loaded: HashSet::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// Create an object brick container.
    pub fn brick(class_name: impl Into<String>, object_id: u64, brick: impl Into<String>) -> Self {
        Self::with_kind(class_name, object_id, ContainerKind::Brick { name: brick.into() })
    }

    /// Create a field collection item container.
    pub fn field_collection(
        class_name: impl Into<String>,
        object_id: u64,
        collection: impl Into<String>,
        index: u32,
    ) -> Self {
        Self::with_kind(
            class_name,
            object_id,
            ContainerKind::FieldCollection {
                name: collection.into(),
                index,
            },
        )
    }

    /// Create a localized fields container.
    pub fn localized(
        class_name: impl Into<String>,
        object_id: u64,
        language: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            class_name,
            object_id,
            ContainerKind::Localized {
                language: language.into(),
            },
        )
    }

    /// Names of dirty fields, sorted.
    pub fn dirty_fields(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }
}

impl Container for ObjectContainer {
    fn kind(&self) -> &ContainerKind {
        &self.kind
    }

    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn object_id(&self) -> u64 {
        self.object_id
    }

    fn get_object_var(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    fn set_object_var(&mut self, name: &str, value: FieldValue) {
        self.values.insert(name.to_string(), value);
    }

    fn is_lazy_key_loaded(&self, name: &str) -> bool {
        self.loaded.contains(name)
    }

    fn mark_lazy_key_loaded(&mut self, name: &str) {
        self.loaded.insert(name.to_string());
    }

    fn mark_field_dirty(&mut self, name: &str) {
        self.dirty.insert(name.to_string());
    }

    fn is_field_dirty(&self, name: &str) -> bool {
        self.dirty.contains(name)
    }

    fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    fn clear_dirty(&mut self) {
        self.dirty.clear();
    }
}
