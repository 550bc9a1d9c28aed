//! CLI error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// A file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Field layer error.
    #[error(transparent)]
    Core(#[from] objdef_core::Error),

    /// Protocol error, such as an unknown operator.
    #[error(transparent)]
    Proto(#[from] objdef_proto::Error),
}

/// Result type for CLI commands.
pub type Result<T> = std::result::Result<T, CliError>;
