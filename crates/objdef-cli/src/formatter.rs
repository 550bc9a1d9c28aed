//! Output formatters for command results.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use objdef_proto::{Condition, Value};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// One physical column of a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRow {
    /// Owning field.
    pub field: String,
    /// Fieldtype tag of the field.
    pub fieldtype: String,
    /// `storage` or `query`.
    pub table: &'static str,
    /// Column name.
    pub column: String,
    /// SQL column type.
    pub sql_type: String,
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format a column layout.
    fn format_columns(&self, rows: &[ColumnRow]) -> String;

    /// Format a filter condition.
    fn format_condition(&self, condition: &Condition) -> String;

    /// Format an error message.
    fn format_error(&self, error: &str) -> String;

    /// Format a simple message.
    fn format_message(&self, message: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_columns(&self, rows: &[ColumnRow]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Field", "Fieldtype", "Table", "Column", "Type"]);

        for row in rows {
            table.add_row(vec![
                Cell::new(&row.field),
                Cell::new(&row.fieldtype),
                Cell::new(row.table),
                Cell::new(&row.column),
                Cell::new(&row.sql_type),
            ]);
        }

        format!("{}\n{} column(s)", table, rows.len())
    }

    fn format_condition(&self, condition: &Condition) -> String {
        let mut table = Table::new();
        table.set_header(vec!["#", "Parameter"]);
        for (i, param) in condition.params.iter().enumerate() {
            table.add_row(vec![Cell::new(i + 1), Cell::new(param.to_sql_literal())]);
        }

        if condition.params.is_empty() {
            condition.sql.clone()
        } else {
            format!("{}\n{}", condition.sql, table)
        }
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}", error)
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_columns(&self, rows: &[ColumnRow]) -> String {
        let columns: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| {
                serde_json::json!({
                    "field": row.field,
                    "fieldtype": row.fieldtype,
                    "table": row.table,
                    "column": row.column,
                    "type": row.sql_type,
                })
            })
            .collect();
        serde_json::to_string_pretty(&columns).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_condition(&self, condition: &Condition) -> String {
        serde_json::json!({
            "sql": condition.sql,
            "params": condition.params.iter().map(value_to_json).collect::<Vec<_>>(),
            "inline": condition.to_inline_sql(),
        })
        .to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({
            "error": error
        })
        .to_string()
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({
            "message": message
        })
        .to_string()
    }
}

/// CSV formatter.
pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format_columns(&self, rows: &[ColumnRow]) -> String {
        let mut output = String::from("field,fieldtype,table,column,type\n");
        for row in rows {
            let cells = [
                row.field.as_str(),
                row.fieldtype.as_str(),
                row.table,
                row.column.as_str(),
                row.sql_type.as_str(),
            ];
            let escaped: Vec<String> = cells.iter().map(|c| escape_csv(c)).collect();
            output.push_str(&escaped.join(","));
            output.push('\n');
        }
        output
    }

    fn format_condition(&self, condition: &Condition) -> String {
        format!(
            "sql,inline\n{},{}\n",
            escape_csv(&condition.sql),
            escape_csv(&condition.to_inline_sql())
        )
    }

    fn format_error(&self, error: &str) -> String {
        format!("error\n{}", escape_csv(error))
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

/// Convert a Value to JSON.
fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int64(i) => serde_json::json!(i),
        Value::Float64(f) => serde_json::json!(f),
        Value::String(s) => serde_json::Value::String(s.clone()),
    }
}

/// Quote a CSV cell when it needs it.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<ColumnRow> {
        vec![ColumnRow {
            field: "colors".into(),
            fieldtype: "multiselect".into(),
            table: "storage",
            column: "colors".into(),
            sql_type: "text".into(),
        }]
    }

    #[test]
    fn test_table_columns() {
        let output = TableFormatter.format_columns(&rows());
        assert!(output.contains("multiselect"));
        assert!(output.ends_with("1 column(s)"));
    }

    #[test]
    fn test_json_condition() {
        let condition = Condition::new("`colors` LIKE ?", vec![Value::from("%,red,%")]);
        let output = JsonFormatter.format_condition(&condition);
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["sql"], "`colors` LIKE ?");
        assert_eq!(json["params"][0], "%,red,%");
        assert_eq!(json["inline"], "`colors` LIKE '%,red,%'");
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");

        let output = CsvFormatter.format_columns(&rows());
        assert_eq!(output, "field,fieldtype,table,column,type\ncolors,multiselect,storage,colors,text\n");
    }
}
