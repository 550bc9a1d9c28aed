//! objdef command-line tool.
//!
//! Loads class definitions from JSON and reports what the field layer makes
//! of them: definition-save checks, column layouts, filter conditions and the
//! serialized definition as a request would see it.

pub mod commands;
pub mod error;
pub mod formatter;

pub use commands::{execute, Command};
pub use error::CliError;
pub use formatter::{create_formatter, Formatter, OutputFormat};
