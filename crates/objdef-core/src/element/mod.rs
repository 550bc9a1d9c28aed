//! Referencable elements and the relation resolution service.
//!
//! Relation fields store only `(kind, id)`; reading them back goes through an
//! [`ElementResolver`], which turns the pair into a live [`Element`] or
//! reports that the referent no longer exists.

mod resolver;

pub use resolver::{ElementResolver, MemoryElementStore};

use objdef_proto::{ElementKind, ElementRef, RelationPayload};

/// A resolved element handle.
///
/// Equality of handles is by reference only; metadata is a snapshot taken at
/// resolution time.
#[derive(Debug, Clone)]
pub struct Element {
    reference: ElementRef,
    path: String,
    subtype: String,
    class_name: Option<String>,
    published: bool,
}

impl Element {
    /// Create a data object handle.
    pub fn object(id: u64, path: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            reference: ElementRef::object(id),
            path: path.into(),
            subtype: "object".into(),
            class_name: Some(class_name.into()),
            published: true,
        }
    }

    /// Create an asset handle.
    pub fn asset(id: u64, path: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            reference: ElementRef::asset(id),
            path: path.into(),
            subtype: subtype.into(),
            class_name: None,
            published: true,
        }
    }

    /// Create a document handle.
    pub fn document(id: u64, path: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            reference: ElementRef::document(id),
            path: path.into(),
            subtype: subtype.into(),
            class_name: None,
            published: true,
        }
    }

    /// Set the published flag.
    pub fn with_published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    /// Set the object subtype (`object` or `variant`).
    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = subtype.into();
        self
    }

    /// Same metadata, different reference.
    pub fn with_reference(mut self, reference: ElementRef) -> Self {
        self.reference = reference;
        self
    }

    /// The `(kind, id)` reference.
    pub fn reference(&self) -> ElementRef {
        self.reference
    }

    /// Element kind.
    pub fn kind(&self) -> ElementKind {
        self.reference.kind
    }

    /// Element id.
    pub fn id(&self) -> u64 {
        self.reference.id
    }

    /// Full real path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Concrete subtype.
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Class name for data objects.
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Whether the element is published.
    pub fn is_published(&self) -> bool {
        self.published
    }

    /// Editor payload of this element.
    pub fn to_payload(&self) -> RelationPayload {
        RelationPayload {
            id: Some(self.id()),
            path: self.path.clone(),
            subtype: self.subtype.clone(),
            kind: Some(self.kind()),
            published: self.published,
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.reference == other.reference
    }
}

impl Eq for Element {}
