//! Command handling.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::Subcommand;
use objdef_core::catalog::OptionsProviderRegistry;
use objdef_core::{ClassDefinition, ConditionBuilder, EngineConfig};
use objdef_proto::{FilterRequest, Operator, Value};
use tracing::{debug, info};

use crate::error::{CliError, Result};
use crate::formatter::{ColumnRow, Formatter};

/// A CLI command.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run definition-save checks on a class definition
    Check {
        /// Class definition JSON file
        definition: PathBuf,
    },

    /// List the storage and query columns of a class
    Columns {
        /// Class definition JSON file
        definition: PathBuf,
    },

    /// Build the filter condition for one field
    Filter {
        /// Class definition JSON file
        definition: PathBuf,

        /// Field to filter on
        #[arg(short = 'n', long)]
        field: String,

        /// Filter value (`null` for no value, `<kind>|<id>` for relations)
        #[arg(short = 'v', long)]
        value: String,

        /// Comparison operator
        #[arg(short = 'o', long, default_value = "=")]
        operator: String,

        /// Table alias prefix for object-brick columns
        #[arg(long)]
        brick_prefix: Option<String>,
    },

    /// Print the definition as a request would see it
    Show {
        /// Class definition JSON file
        definition: PathBuf,

        /// Drop options supplied by options providers
        #[arg(long)]
        remove_dynamic_options: bool,
    },
}

/// Load a class definition file.
pub fn load_definition(path: &Path) -> Result<ClassDefinition> {
    let json = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let class = ClassDefinition::from_json(&json)?;
    debug!(
        path = %path.display(),
        class = class.name(),
        fields = class.fields().len(),
        "loaded class definition"
    );
    Ok(class)
}

/// Storage and query columns of every field, in declaration order.
pub fn column_rows(class: &ClassDefinition) -> Vec<ColumnRow> {
    let mut rows = Vec::new();
    for field in class.fields() {
        let field_type = field.field_type();
        let storage = field_type.column_types().into_iter().map(|c| ("storage", c));
        let query = field_type.query_column_types().into_iter().map(|c| ("query", c));
        for (table, column) in storage.chain(query) {
            rows.push(ColumnRow {
                field: field.name().to_string(),
                fieldtype: field.fieldtype().to_string(),
                table,
                column: column.name,
                sql_type: column.sql_type,
            });
        }
    }
    rows
}

/// Execute a command and return its formatted output.
pub fn execute(
    command: &Command,
    config: &EngineConfig,
    formatter: &dyn Formatter,
) -> Result<String> {
    match command {
        Command::Check { definition } => {
            let class = load_definition(definition)?;
            class.save_definition(&OptionsProviderRegistry::new())?;
            info!(class = class.name(), "definition passed checks");
            Ok(formatter.format_message(&format!(
                "{}: {} field(s) ok",
                class.name(),
                class.fields().len()
            )))
        }

        Command::Columns { definition } => {
            let class = load_definition(definition)?;
            Ok(formatter.format_columns(&column_rows(&class)))
        }

        Command::Filter {
            definition,
            field,
            value,
            operator,
            brick_prefix,
        } => {
            let class = load_definition(definition)?;
            let field_def = class.field(field)?;
            let value = if value.eq_ignore_ascii_case("null") {
                Value::Null
            } else {
                Value::from(value.as_str())
            };
            let mut request = FilterRequest::new(field.as_str(), Operator::from_str(operator)?, value);
            if let Some(prefix) = brick_prefix {
                request = request.with_brick_prefix(prefix.as_str());
            }
            let builder = ConditionBuilder::new(config);
            let condition = builder.filter_condition(field_def, class.name(), &request)?;
            Ok(formatter.format_condition(&condition))
        }

        Command::Show {
            definition,
            remove_dynamic_options,
        } => {
            let class = load_definition(definition)?;
            let mut request = config.request_context();
            if *remove_dynamic_options {
                request = request.with_remove_dynamic_options(true);
            }
            Ok(class.to_json(&request)?)
        }
    }
}
