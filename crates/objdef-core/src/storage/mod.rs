//! Persistence adapter for objdef.
//!
//! The field layer reads and writes through [`PersistenceAdapter`]; the
//! database driver behind it is not part of this crate. [`MemoryStore`] keeps
//! rkyv-encoded rows in memory.

mod memory;

pub use memory::MemoryStore;

use objdef_proto::{OwnerType, RelationRow, StoredRow};

use crate::container::Container;
use crate::error::Result;

/// Identifies the owner of a row: an object, or a brick, collection item or
/// language inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerKey {
    /// Class of the owning object.
    pub class_name: String,
    /// Id of the owning object.
    pub object_id: u64,
    /// Owner type within the object.
    pub owner_type: OwnerType,
    /// Brick name, `collection:index` or language; empty for the object.
    pub owner_name: String,
}

impl OwnerKey {
    /// Key of an object-level owner.
    pub fn object(class_name: impl Into<String>, object_id: u64) -> Self {
        Self {
            class_name: class_name.into(),
            object_id,
            owner_type: OwnerType::Object,
            owner_name: String::new(),
        }
    }

    /// Key of the owner a container represents.
    pub fn for_container(container: &dyn Container) -> Self {
        let kind = container.kind();
        Self {
            class_name: container.class_name().to_string(),
            object_id: container.object_id(),
            owner_type: kind.owner_type(),
            owner_name: kind.owner_name(),
        }
    }
}

/// Storage access used by the field layer.
///
/// Calls are synchronous; isolation between concurrent writers is the
/// implementation's concern.
pub trait PersistenceAdapter: Send + Sync {
    /// Fetch the storage row of an owner.
    fn fetch_row(&self, owner: &OwnerKey) -> Result<Option<StoredRow>>;

    /// Replace the storage row of an owner.
    fn write_row(&self, owner: &OwnerKey, row: &StoredRow) -> Result<()>;

    /// Fetch the relation rows of one field, ordered by position.
    fn fetch_relations(&self, owner: &OwnerKey, field_name: &str) -> Result<Vec<RelationRow>>;

    /// Replace the relation rows of one field.
    fn write_relations(&self, owner: &OwnerKey, field_name: &str, rows: &[RelationRow])
        -> Result<()>;
}
