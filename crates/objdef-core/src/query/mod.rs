//! Query condition building.
//!
//! Turns a field's logical filter request into a backend condition fragment
//! plus bound parameters. Execution is left to the database driver.

mod condition;

pub use condition::{escape_like, unsupported_operator, ConditionBuilder};
