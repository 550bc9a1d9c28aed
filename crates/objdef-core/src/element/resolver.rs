//! Relation resolution service.

use dashmap::DashMap;
use objdef_proto::{ElementKind, ElementRef};

use super::Element;

/// Resolves a `(kind, id)` pair to a live element.
pub trait ElementResolver: Send + Sync {
    /// Look up an element; `None` when it does not exist.
    fn get_element_by_id(&self, kind: ElementKind, id: u64) -> Option<Element>;

    /// Look up an element by reference.
    fn resolve(&self, reference: ElementRef) -> Option<Element> {
        self.get_element_by_id(reference.kind, reference.id)
    }
}

/// In-memory element registry.
#[derive(Debug, Default)]
pub struct MemoryElementStore {
    elements: DashMap<ElementRef, Element>,
}

impl MemoryElementStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an element.
    pub fn insert(&self, element: Element) {
        self.elements.insert(element.reference(), element);
    }

    /// Remove an element, returning it if present.
    pub fn remove(&self, reference: ElementRef) -> Option<Element> {
        self.elements.remove(&reference).map(|(_, e)| e)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl ElementResolver for MemoryElementStore {
    fn get_element_by_id(&self, kind: ElementKind, id: u64) -> Option<Element> {
        self.elements
            .get(&ElementRef::new(kind, id))
            .map(|e| e.value().clone())
    }
}
