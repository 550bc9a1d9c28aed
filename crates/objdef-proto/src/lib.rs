//! objdef protocol types.
//!
//! This crate defines the representations a field value takes outside of
//! memory: scalar column values, element references, editor payloads, filter
//! requests with their generated conditions, and the stored row shapes handed
//! to a persistence adapter.
//!
//! # Modules
//!
//! - [`value`] - Scalar column and parameter values
//! - [`element`] - Element kinds and `(kind, id)` references
//! - [`editor`] - Editor and grid payloads
//! - [`filter`] - Filter requests, operators and condition fragments
//! - [`row`] - Stored rows and relation rows
//! - [`error`] - Protocol error types
//!
//! # Serialization
//!
//! Stored types derive `rkyv::Archive`, `rkyv::Serialize` and
//! `rkyv::Deserialize`; wire types derive serde for JSON.
//!
//! ```ignore
//! use objdef_proto::{StoredRow, ColumnValue, Value};
//!
//! let row = StoredRow { columns: vec![ColumnValue::new("title", "Hello".into())], ..Default::default() };
//! let bytes = row.to_bytes()?;
//! let decoded = StoredRow::from_bytes(&bytes)?;
//! ```

pub mod editor;
pub mod element;
pub mod error;
pub mod filter;
pub mod row;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use editor::{EditorValue, GridPayload, RelationPayload, SelectOption};
pub use element::{ElementKind, ElementRef};
pub use filter::{Condition, FilterRequest, Operator};
pub use row::{ColumnValue, OwnerType, RelationRow, RelationRows, StoredRow};
pub use value::Value;
