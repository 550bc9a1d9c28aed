//! Condition fragments for field filters.

use objdef_proto::{Condition, FilterRequest, Operator, Value};
use tracing::debug;

use crate::catalog::FieldDefinition;
use crate::config::{EngineConfig, DEFAULT_IDENTIFIER_QUOTE};
use crate::error::{Error, Result};

/// Builds condition fragments with positional parameters.
///
/// Field types decide which operators they support and what columns they
/// compare; the builder owns quoting and the shape of each fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionBuilder {
    quote: char,
}

impl Default for ConditionBuilder {
    fn default() -> Self {
        Self {
            quote: DEFAULT_IDENTIFIER_QUOTE,
        }
    }
}

impl ConditionBuilder {
    /// Create a builder from engine configuration.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            quote: config.identifier_quote,
        }
    }

    /// Quote an identifier, doubling embedded quote characters.
    pub fn quote_identifier(&self, name: &str) -> String {
        let q = self.quote;
        let escaped = name.replace(q, &format!("{}{}", q, q));
        format!("{}{}{}", q, escaped, q)
    }

    /// Quoted column reference with an optional brick table prefix.
    pub fn column(&self, name: &str, brick_prefix: Option<&str>) -> String {
        format!("{}{}", brick_prefix.unwrap_or(""), self.quote_identifier(name))
    }

    /// `<column> <op> ?`
    pub fn compare(&self, column: &str, operator: Operator, value: Value) -> Condition {
        Condition::new(format!("{} {} ?", column, operator.as_sql()), vec![value])
    }

    /// `<column> IS NULL`
    pub fn is_null(&self, column: &str) -> Condition {
        Condition::raw(format!("{} IS NULL", column))
    }

    /// Membership test against a comma-wrapped list column: `<column> LIKE ?`
    /// bound to `%,<member>,%`.
    pub fn contains_member(&self, column: &str, member: &str) -> Condition {
        Condition::new(
            format!("{} LIKE ?", column),
            vec![Value::String(format!("%,{},%", escape_like(member)))],
        )
    }

    /// Filter fragment for a request on a field of the given class.
    pub fn filter_condition(
        &self,
        field: &FieldDefinition,
        class_name: &str,
        request: &FilterRequest,
    ) -> Result<Condition> {
        let condition = field
            .field_type()
            .build_filter_condition(request, class_name, self)?;
        debug!(
            class = class_name,
            field = field.name(),
            operator = %request.operator,
            sql = %condition.sql,
            "built filter condition"
        );
        Ok(condition)
    }
}

/// Escape `LIKE` wildcards (`%`, `_`) and the escape character itself.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Error for an operator a field type does not support.
pub fn unsupported_operator(fieldtype: &str, class_name: &str, operator: Operator) -> Error {
    Error::UnsupportedOperator {
        fieldtype: fieldtype.to_string(),
        class: class_name.to_string(),
        operator: operator.as_sql().to_string(),
    }
}
