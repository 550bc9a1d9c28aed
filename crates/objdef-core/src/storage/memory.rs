//! In-memory persistence adapter.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use objdef_proto::{RelationRow, RelationRows, StoredRow};
use tracing::debug;

use super::{OwnerKey, PersistenceAdapter};
use crate::error::Result;

/// Keeps rows in memory, encoded with rkyv as a disk store would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: DashMap<OwnerKey, Vec<u8>>,
    relations: DashMap<(OwnerKey, String), Vec<u8>>,
    relation_fetches: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of relation fetches served so far.
    pub fn relation_fetches(&self) -> usize {
        self.relation_fetches.load(Ordering::Relaxed)
    }
}

impl PersistenceAdapter for MemoryStore {
    fn fetch_row(&self, owner: &OwnerKey) -> Result<Option<StoredRow>> {
        match self.rows.get(owner) {
            Some(bytes) => Ok(Some(StoredRow::from_bytes(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn write_row(&self, owner: &OwnerKey, row: &StoredRow) -> Result<()> {
        let bytes = row.to_bytes()?;
        debug!(
            class = %owner.class_name,
            object_id = owner.object_id,
            bytes = bytes.len(),
            "wrote storage row"
        );
        self.rows.insert(owner.clone(), bytes);
        Ok(())
    }

    fn fetch_relations(&self, owner: &OwnerKey, field_name: &str) -> Result<Vec<RelationRow>> {
        self.relation_fetches.fetch_add(1, Ordering::Relaxed);
        let key = (owner.clone(), field_name.to_string());
        let mut rows = match self.relations.get(&key) {
            Some(bytes) => RelationRows::from_bytes(bytes.value())?.rows,
            None => Vec::new(),
        };
        rows.sort_by_key(|r| r.position);
        Ok(rows)
    }

    fn write_relations(
        &self,
        owner: &OwnerKey,
        field_name: &str,
        rows: &[RelationRow],
    ) -> Result<()> {
        let key = (owner.clone(), field_name.to_string());
        if rows.is_empty() {
            self.relations.remove(&key);
            return Ok(());
        }
        let bytes = RelationRows {
            rows: rows.to_vec(),
        }
        .to_bytes()?;
        self.relations.insert(key, bytes);
        Ok(())
    }
}
