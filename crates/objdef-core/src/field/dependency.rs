//! Dependency records and id remapping.

use std::collections::{BTreeMap, HashMap};

use objdef_proto::{ElementKind, ElementRef};
use serde::{Deserialize, Serialize};

/// One referenced element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    /// Element id.
    pub id: u64,
    /// Element kind.
    #[serde(rename = "type")]
    pub kind: ElementKind,
}

impl From<ElementRef> for DependencyRecord {
    fn from(r: ElementRef) -> Self {
        Self {
            id: r.id,
            kind: r.kind,
        }
    }
}

/// Dependencies keyed by `"<kind>_<id>"`.
pub type Dependencies = BTreeMap<String, DependencyRecord>;

/// Old-to-new id tables, one per element kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMapping {
    tables: HashMap<ElementKind, HashMap<u64, u64>>,
}

impl IdMapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry.
    pub fn insert(&mut self, kind: ElementKind, old_id: u64, new_id: u64) {
        self.tables.entry(kind).or_default().insert(old_id, new_id);
    }

    /// Add an entry, builder style.
    pub fn with(mut self, kind: ElementKind, old_id: u64, new_id: u64) -> Self {
        self.insert(kind, old_id, new_id);
        self
    }

    /// New id for `(kind, old_id)`, if mapped.
    pub fn get(&self, kind: ElementKind, old_id: u64) -> Option<u64> {
        self.tables.get(&kind).and_then(|t| t.get(&old_id)).copied()
    }

    /// Whether the mapping has no entries.
    pub fn is_empty(&self) -> bool {
        self.tables.values().all(HashMap::is_empty)
    }
}

/// Apply the mapping to one reference; unmapped references are unchanged.
pub fn rewrite_reference(reference: ElementRef, mapping: &IdMapping) -> ElementRef {
    match mapping.get(reference.kind, reference.id) {
        Some(new_id) => ElementRef::new(reference.kind, new_id),
        None => reference,
    }
}
