//! Core error types.

use thiserror::Error;

/// A user-correctable validation failure on one field.
///
/// Always names the field and its fieldtype tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Field name.
    pub field: String,
    /// Fieldtype tag of the field.
    pub fieldtype: String,
    /// Human-readable message.
    pub message: String,
}

impl ValidationError {
    /// Create a validation error with a custom message.
    pub fn new(
        field: impl Into<String>,
        fieldtype: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            fieldtype: fieldtype.into(),
            message: message.into(),
        }
    }

    /// A mandatory field holds no value.
    pub fn empty_mandatory(field: &str, fieldtype: &str) -> Self {
        Self::new(field, fieldtype, format!("Empty mandatory field [ {} ]", field))
    }

    /// The value does not have the shape the fieldtype declares.
    pub fn invalid_data(field: &str, fieldtype: &str) -> Self {
        Self::new(
            field,
            fieldtype,
            format!("Invalid data in field `{}` [type: {}]", field, fieldtype),
        )
    }
}

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Field validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Filter operator not supported by the field type.
    #[error("filtering {fieldtype} in class {class} does not support the \"{operator}\" operator")]
    UnsupportedOperator {
        /// Fieldtype tag.
        fieldtype: String,
        /// Class the field belongs to.
        class: String,
        /// Rejected operator.
        operator: String,
    },

    /// Filter value cannot be used with the field.
    #[error("invalid filter on field {field}: {message}")]
    InvalidFilter {
        /// Field name.
        field: String,
        /// What is wrong with the filter.
        message: String,
    },

    /// Field definition rejected at definition-save time.
    #[error("Field {field}: {message}")]
    Definition {
        /// Field name.
        field: String,
        /// Why the definition was rejected.
        message: String,
    },

    /// No field with this name in the class.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] objdef_proto::Error),

    /// Persistence adapter error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Deserialization(e.to_string())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
