//! Class catalog for objdef.
//!
//! The catalog holds class definitions, their field definitions, and the
//! options providers multiselect fields may consult.

mod class;
mod definition;
mod options;

pub use class::ClassDefinition;
pub use definition::{
    normalize_allowed_types, parse_integer_cast, Dimension, FieldCommon, FieldDefinition,
};
pub(crate) use definition::{allowed_types, lenient_u32};
pub use options::{
    OptionsContext, OptionsProvider, OptionsProviderError, OptionsProviderRegistry,
    StaticOptionsProvider,
};
