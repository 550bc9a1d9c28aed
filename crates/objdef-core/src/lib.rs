//! objdef Core - Field types, relation resolution, and persistence mapping.
//!
//! This crate provides the schema-driven field layer for objdef: class and
//! field definitions, the value conversions every field type implements, lazy
//! relation loading, dependency extraction, id rewriting, and filter condition
//! building.

pub mod catalog;
pub mod config;
pub mod container;
pub mod element;
pub mod error;
pub mod field;
pub mod mapper;
pub mod query;
pub mod storage;

pub use catalog::{
    ClassDefinition, Dimension, FieldCommon, FieldDefinition, OptionsContext, OptionsProvider,
    OptionsProviderError, OptionsProviderRegistry, StaticOptionsProvider,
};
pub use config::{EngineConfig, RequestContext};
pub use container::{Container, ContainerKind, ObjectContainer};
pub use element::{Element, ElementResolver, MemoryElementStore};
pub use error::{Error, Result, ValidationError};
pub use mapper::ObjectMapper;
pub use query::ConditionBuilder;
pub use storage::{MemoryStore, OwnerKey, PersistenceAdapter};

// Field type exports
pub use field::{
    DefinitionHooks, Dependencies, DependencyRecord, FieldContext, FieldType, FieldValue,
    IdMapping, IdRewriter, Input, LazyLoadable, Loaded, ManyToOneRelation, Multiselect,
    Normalizable, Numeric, SetAlgebra, StorageValue,
};

// Re-export proto types for convenience
pub use objdef_proto as proto;
