//! Filter requests and the condition fragments generated from them.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::value::Value;
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// Comparison operator of a filter request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerdeSerialize, SerdeDeserialize)]
pub enum Operator {
    /// `=`
    #[serde(rename = "=")]
    Eq,
    /// `!=`
    #[serde(rename = "!=")]
    Ne,
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `<=`
    #[serde(rename = "<=")]
    Le,
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// `>=`
    #[serde(rename = ">=")]
    Ge,
    /// `LIKE`
    #[serde(rename = "LIKE")]
    Like,
    /// `NOT LIKE`
    #[serde(rename = "NOT LIKE")]
    NotLike,
}

impl Operator {
    /// SQL spelling of the operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
        }
    }
}

impl Default for Operator {
    fn default() -> Self {
        Operator::Eq
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_uppercase().as_str() {
            "=" | "==" => Ok(Operator::Eq),
            "!=" | "<>" => Ok(Operator::Ne),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            "LIKE" => Ok(Operator::Like),
            "NOT LIKE" => Ok(Operator::NotLike),
            _ => Err(Error::UnknownOperator(s.to_string())),
        }
    }
}

/// A logical filter request on one field.
#[derive(Debug, Clone, PartialEq, SerdeSerialize, SerdeDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRequest {
    /// Value to compare against.
    pub value: Value,
    /// Comparison operator.
    #[serde(default)]
    pub operator: Operator,
    /// Column (field) name.
    pub name: String,
    /// Table alias prefix for object-brick columns (e.g. `` `brick`. ``).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brick_prefix: Option<String>,
}

impl FilterRequest {
    /// Create a request with the `=` operator.
    pub fn eq(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, Operator::Eq, value)
    }

    /// Create a request.
    pub fn new(name: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            operator,
            name: name.into(),
            brick_prefix: None,
        }
    }

    /// Set the brick table prefix.
    pub fn with_brick_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.brick_prefix = Some(prefix.into());
        self
    }
}

/// A backend condition fragment with positional `?` placeholders.
#[derive(Debug, Clone, PartialEq, Default, SerdeSerialize, SerdeDeserialize)]
pub struct Condition {
    /// Condition text.
    pub sql: String,
    /// Parameters bound to the placeholders, in order.
    pub params: Vec<Value>,
}

impl Condition {
    /// Create a condition.
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Create a condition without parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    /// Conjunction of two conditions, parenthesized.
    pub fn and(self, other: Condition) -> Self {
        let mut params = self.params;
        params.extend(other.params);
        Self {
            sql: format!("({} AND {})", self.sql, other.sql),
            params,
        }
    }

    /// Render with parameters inlined as SQL literals.
    ///
    /// Placeholders inside backtick-quoted identifiers or string literals are
    /// left alone.
    pub fn to_inline_sql(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut params = self.params.iter();
        let mut quote: Option<char> = None;

        for c in self.sql.chars() {
            match quote {
                Some(q) => {
                    if c == q {
                        quote = None;
                    }
                    out.push(c);
                }
                None => match c {
                    '`' | '\'' => {
                        quote = Some(c);
                        out.push(c);
                    }
                    '?' => match params.next() {
                        Some(param) => out.push_str(&param.to_sql_literal()),
                        None => out.push(c),
                    },
                    _ => out.push(c),
                },
            }
        }
        out
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_inline_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parse() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::Ne);
        assert_eq!("not  like".parse::<Operator>().unwrap(), Operator::NotLike);
        assert!("BETWEEN".parse::<Operator>().is_err());
    }

    #[test]
    fn test_condition_and_inline() {
        let cond = Condition::new("`owner__type` = ?", vec![Value::from("asset")])
            .and(Condition::new("`owner__id` = ?", vec![Value::Int64(17)]));
        assert_eq!(cond.sql, "(`owner__type` = ? AND `owner__id` = ?)");
        assert_eq!(
            cond.to_inline_sql(),
            "(`owner__type` = 'asset' AND `owner__id` = 17)"
        );
    }

    #[test]
    fn test_inline_skips_quoted_placeholders() {
        let cond = Condition::new("`a?b` = ?", vec![Value::Int64(1)]);
        assert_eq!(cond.to_inline_sql(), "`a?b` = 1");
    }

    #[test]
    fn test_filter_request_json() {
        let req: FilterRequest = serde_json::from_str(
            r#"{"value": "red", "operator": "=", "name": "colors", "brickPrefix": "`b`."}"#,
        )
        .unwrap();
        assert_eq!(req.operator, Operator::Eq);
        assert_eq!(req.brick_prefix.as_deref(), Some("`b`."));

        let req: FilterRequest = serde_json::from_str(r#"{"value": 3, "name": "n"}"#).unwrap();
        assert_eq!(req.operator, Operator::Eq);
        assert_eq!(req.value, Value::Int64(3));
    }
}
