//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Unknown element kind tag.
    #[error("unknown element kind: {0}")]
    UnknownKind(String),

    /// Malformed element token (expected `<kind>|<id>`).
    #[error("invalid element token: {0}")]
    InvalidToken(String),

    /// Element id does not fit a signed 64-bit column.
    #[error("id out of range: {0}")]
    IdOutOfRange(u64),

    /// Unknown filter operator.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
}
