//! Single-column scalar field types.
//!
//! Their query representation equals their storage representation: one
//! column named after the field.

use std::collections::BTreeMap;

use objdef_proto::{Condition, EditorValue, FilterRequest, Operator, Value};
use serde::{Deserialize, Serialize};

use crate::catalog::{lenient_u32, Dimension, FieldCommon, OptionsProviderRegistry};
use crate::error::{Error, Result, ValidationError};
use crate::query::{unsupported_operator, ConditionBuilder};

use super::{
    check_mandatory, escape_html, ColumnType, DefinitionHooks, FieldContext, FieldType,
    FieldValue, Loaded, Normalizable, StorageValue,
};

/// Column length of an input field when none is configured.
pub const DEFAULT_INPUT_COLUMN_LENGTH: u32 = 190;

/// Single-line text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Input {
    #[serde(flatten)]
    common: FieldCommon,
    #[serde(default)]
    width: Dimension,
    #[serde(
        default,
        deserialize_with = "lenient_u32",
        skip_serializing_if = "Option::is_none"
    )]
    column_length: Option<u32>,
}

impl Input {
    /// Create an input field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            common: FieldCommon::new(name),
            width: Dimension::default(),
            column_length: None,
        }
    }

    /// Require a value.
    pub fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.common.set_mandatory(mandatory);
        self
    }

    /// Set the column length.
    pub fn with_column_length(mut self, length: u32) -> Self {
        self.column_length = Some(length);
        self
    }

    /// Common settings.
    pub fn common(&self) -> &FieldCommon {
        &self.common
    }

    /// Common settings, mutable.
    pub fn common_mut(&mut self) -> &mut FieldCommon {
        &mut self.common
    }

    /// Layout width.
    pub fn width(&self) -> &Dimension {
        &self.width
    }

    /// Set the layout width.
    pub fn set_width(&mut self, width: impl Into<Dimension>) {
        self.width = width.into();
    }

    /// Effective column length.
    pub fn column_length(&self) -> u32 {
        self.column_length.unwrap_or(DEFAULT_INPUT_COLUMN_LENGTH)
    }

    fn text_of(&self, value: &FieldValue) -> std::result::Result<Option<String>, ValidationError> {
        match value {
            FieldValue::Null => Ok(None),
            FieldValue::Scalar(v) => Ok(v.to_text().filter(|s| !s.is_empty())),
            _ => Err(ValidationError::invalid_data(self.name(), self.fieldtype())),
        }
    }
}

impl FieldType for Input {
    fn name(&self) -> &str {
        self.common.name()
    }

    fn fieldtype(&self) -> &'static str {
        "input"
    }

    fn is_mandatory(&self) -> bool {
        self.common.mandatory()
    }

    fn encode_for_storage(&self, value: &FieldValue) -> Result<StorageValue> {
        Ok(StorageValue::Column(self.text_of(value)?.into()))
    }

    fn decode_from_storage(
        &self,
        stored: &StorageValue,
        _ctx: &FieldContext<'_>,
    ) -> Result<Loaded> {
        match stored {
            StorageValue::Column(v) => Ok(Loaded::clean(
                v.to_text()
                    .filter(|s| !s.is_empty())
                    .map(FieldValue::text)
                    .unwrap_or_default(),
            )),
            StorageValue::Relations(_) => Err(Error::Deserialization(format!(
                "field {} is not stored in the relation table",
                self.name()
            ))),
        }
    }

    fn encode_for_query(&self, value: &FieldValue) -> Result<BTreeMap<String, Value>> {
        let mut columns: BTreeMap<String, Value> = BTreeMap::new();
        columns.insert(self.name().to_string(), self.text_of(value)?.into());
        Ok(columns)
    }

    fn encode_for_editor(&self, value: &FieldValue) -> EditorValue {
        match self.text_of(value) {
            Ok(Some(text)) => EditorValue::Text(text),
            _ => EditorValue::Null,
        }
    }

    fn decode_from_editor(
        &self,
        payload: &EditorValue,
        _ctx: &FieldContext<'_>,
    ) -> Result<FieldValue> {
        match payload {
            EditorValue::Null => Ok(FieldValue::Null),
            EditorValue::Text(s) if s.is_empty() => Ok(FieldValue::Null),
            EditorValue::Text(s) => Ok(FieldValue::text(s.clone())),
            EditorValue::Number(n) => Ok(FieldValue::text(n.to_string())),
            _ => Err(ValidationError::invalid_data(self.name(), self.fieldtype()).into()),
        }
    }

    fn validate(
        &self,
        value: &FieldValue,
        skip_mandatory: bool,
    ) -> std::result::Result<(), ValidationError> {
        check_mandatory(self, value, skip_mandatory)?;
        let text = match value {
            FieldValue::Null => return Ok(()),
            FieldValue::Scalar(Value::String(s)) => s,
            _ => return Err(ValidationError::invalid_data(self.name(), self.fieldtype())),
        };
        if text.chars().count() > self.column_length() as usize {
            return Err(ValidationError::new(
                self.name(),
                self.fieldtype(),
                format!("Value in field [ {} ] is too long", self.name()),
            ));
        }
        Ok(())
    }

    fn preview(&self, value: &FieldValue) -> String {
        self.text_of(value)
            .ok()
            .flatten()
            .map(|s| escape_html(&s))
            .unwrap_or_default()
    }

    fn is_equal(&self, a: &FieldValue, b: &FieldValue) -> bool {
        match (self.text_of(a), self.text_of(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => a == b,
        }
    }

    fn build_filter_condition(
        &self,
        request: &FilterRequest,
        class_name: &str,
        builder: &ConditionBuilder,
    ) -> Result<Condition> {
        let column = filter_column(self.name(), request, builder);
        match (request.operator, &request.value) {
            (Operator::Eq, Value::Null) => Ok(builder.is_null(&column)),
            (Operator::Ne, Value::Null) => Ok(Condition::raw(format!("{} IS NOT NULL", column))),
            (Operator::Eq | Operator::Ne | Operator::Like | Operator::NotLike, value) => {
                let text = value.to_text().unwrap_or_default();
                Ok(builder.compare(&column, request.operator, Value::String(text)))
            }
            (operator, _) => Err(unsupported_operator(self.fieldtype(), class_name, operator)),
        }
    }

    fn csv_export(&self, value: &FieldValue) -> String {
        self.text_of(value).ok().flatten().unwrap_or_default()
    }

    fn search_index(&self, value: &FieldValue) -> String {
        self.csv_export(value)
    }

    fn column_types(&self) -> Vec<ColumnType> {
        vec![ColumnType::new(
            self.name(),
            format!("varchar({})", self.column_length()),
        )]
    }

    fn query_column_types(&self) -> Vec<ColumnType> {
        self.column_types()
    }

    fn is_filterable(&self) -> bool {
        true
    }

    fn is_diff_change_allowed(&self) -> bool {
        true
    }
}

impl Normalizable for Input {
    fn normalize(&self, value: &FieldValue) -> serde_json::Value {
        match self.text_of(value) {
            Ok(Some(text)) => serde_json::Value::String(text),
            _ => serde_json::Value::Null,
        }
    }

    fn denormalize(
        &self,
        value: &serde_json::Value,
        _ctx: &FieldContext<'_>,
    ) -> Result<FieldValue> {
        match value {
            serde_json::Value::Null => Ok(FieldValue::Null),
            serde_json::Value::String(s) if s.is_empty() => Ok(FieldValue::Null),
            serde_json::Value::String(s) => Ok(FieldValue::text(s.clone())),
            serde_json::Value::Number(n) => Ok(FieldValue::text(n.to_string())),
            other => Err(Error::Deserialization(format!(
                "field {}: expected a string, got {}",
                self.name(),
                other
            ))),
        }
    }
}

impl DefinitionHooks for Input {
    fn pre_save(&self, _providers: &OptionsProviderRegistry) -> Result<()> {
        if self.column_length == Some(0) {
            return Err(Error::Definition {
                field: self.name().to_string(),
                message: "column length must be greater than 0".into(),
            });
        }
        Ok(())
    }

    fn synchronize_with_master(&mut self, master: &Self) {
        self.column_length = master.column_length;
    }
}

/// A number.
///
/// Stored as `double`, or as `bigint(20)` when `integer` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Numeric {
    #[serde(flatten)]
    common: FieldCommon,
    #[serde(default)]
    width: Dimension,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_value: Option<f64>,
    #[serde(default)]
    integer: bool,
}

impl Numeric {
    /// Create a numeric field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            common: FieldCommon::new(name),
            width: Dimension::default(),
            min_value: None,
            max_value: None,
            integer: false,
        }
    }

    /// Require a value.
    pub fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.common.set_mandatory(mandatory);
        self
    }

    /// Set the accepted range. Either bound may be open.
    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    /// Store integers only.
    pub fn with_integer(mut self, integer: bool) -> Self {
        self.integer = integer;
        self
    }

    /// Common settings.
    pub fn common(&self) -> &FieldCommon {
        &self.common
    }

    /// Common settings, mutable.
    pub fn common_mut(&mut self) -> &mut FieldCommon {
        &mut self.common
    }

    /// Layout width.
    pub fn width(&self) -> &Dimension {
        &self.width
    }

    /// Set the layout width.
    pub fn set_width(&mut self, width: impl Into<Dimension>) {
        self.width = width.into();
    }

    /// Lower bound.
    pub fn min_value(&self) -> Option<f64> {
        self.min_value
    }

    /// Upper bound.
    pub fn max_value(&self) -> Option<f64> {
        self.max_value
    }

    /// Coerce a scalar into the column's number type; `None` when not a number.
    fn number(&self, value: &Value) -> Option<Value> {
        if self.integer {
            match value {
                Value::Int64(i) => Some(Value::Int64(*i)),
                other => other.as_f64().map(|f| Value::Int64(f.trunc() as i64)),
            }
        } else {
            value.as_f64().filter(|f| f.is_finite()).map(Value::Float64)
        }
    }

    fn number_of(&self, value: &FieldValue) -> std::result::Result<Value, ValidationError> {
        match value {
            FieldValue::Null => Ok(Value::Null),
            FieldValue::Scalar(v) if v.is_empty() => Ok(Value::Null),
            FieldValue::Scalar(v) => self
                .number(v)
                .ok_or_else(|| ValidationError::invalid_data(self.name(), self.fieldtype())),
            _ => Err(ValidationError::invalid_data(self.name(), self.fieldtype())),
        }
    }
}

impl FieldType for Numeric {
    fn name(&self) -> &str {
        self.common.name()
    }

    fn fieldtype(&self) -> &'static str {
        "numeric"
    }

    fn is_mandatory(&self) -> bool {
        self.common.mandatory()
    }

    fn encode_for_storage(&self, value: &FieldValue) -> Result<StorageValue> {
        Ok(StorageValue::Column(self.number_of(value)?))
    }

    fn decode_from_storage(
        &self,
        stored: &StorageValue,
        _ctx: &FieldContext<'_>,
    ) -> Result<Loaded> {
        match stored {
            StorageValue::Column(v) if v.is_empty() => Ok(Loaded::clean(FieldValue::Null)),
            StorageValue::Column(v) => self
                .number(v)
                .map(|n| Loaded::clean(FieldValue::Scalar(n)))
                .ok_or_else(|| {
                    Error::Deserialization(format!(
                        "field {}: stored value is not a number",
                        self.name()
                    ))
                }),
            StorageValue::Relations(_) => Err(Error::Deserialization(format!(
                "field {} is not stored in the relation table",
                self.name()
            ))),
        }
    }

    fn encode_for_query(&self, value: &FieldValue) -> Result<BTreeMap<String, Value>> {
        let mut columns: BTreeMap<String, Value> = BTreeMap::new();
        columns.insert(self.name().to_string(), self.number_of(value)?);
        Ok(columns)
    }

    fn encode_for_editor(&self, value: &FieldValue) -> EditorValue {
        match self.number_of(value).ok().and_then(|v| v.as_f64()) {
            Some(n) => EditorValue::Number(n),
            None => EditorValue::Null,
        }
    }

    fn decode_from_editor(
        &self,
        payload: &EditorValue,
        _ctx: &FieldContext<'_>,
    ) -> Result<FieldValue> {
        let raw = match payload {
            EditorValue::Null => return Ok(FieldValue::Null),
            EditorValue::Text(s) if s.trim().is_empty() => return Ok(FieldValue::Null),
            EditorValue::Text(s) => Value::String(s.clone()),
            EditorValue::Number(n) => Value::Float64(*n),
            _ => return Err(ValidationError::invalid_data(self.name(), self.fieldtype()).into()),
        };
        self.number(&raw)
            .map(FieldValue::Scalar)
            .ok_or_else(|| ValidationError::invalid_data(self.name(), self.fieldtype()).into())
    }

    fn validate(
        &self,
        value: &FieldValue,
        skip_mandatory: bool,
    ) -> std::result::Result<(), ValidationError> {
        check_mandatory(self, value, skip_mandatory)?;
        let number = match self.number_of(value)?.as_f64() {
            Some(n) => n,
            None => return Ok(()),
        };
        if let Some(min) = self.min_value {
            if number < min {
                return Err(ValidationError::new(
                    self.name(),
                    self.fieldtype(),
                    format!("Value in field [ {} ] is not at least {}", self.name(), min),
                ));
            }
        }
        if let Some(max) = self.max_value {
            if number > max {
                return Err(ValidationError::new(
                    self.name(),
                    self.fieldtype(),
                    format!("Value in field [ {} ] is bigger than {}", self.name(), max),
                ));
            }
        }
        Ok(())
    }

    fn preview(&self, value: &FieldValue) -> String {
        self.number_of(value)
            .ok()
            .and_then(|v| v.to_text())
            .unwrap_or_default()
    }

    fn is_equal(&self, a: &FieldValue, b: &FieldValue) -> bool {
        match (self.number_of(a), self.number_of(b)) {
            (Ok(a), Ok(b)) => a.as_f64() == b.as_f64(),
            _ => a == b,
        }
    }

    fn build_filter_condition(
        &self,
        request: &FilterRequest,
        class_name: &str,
        builder: &ConditionBuilder,
    ) -> Result<Condition> {
        let operator = request.operator;
        if matches!(operator, Operator::Like | Operator::NotLike) {
            return Err(unsupported_operator(self.fieldtype(), class_name, operator));
        }

        let column = filter_column(self.name(), request, builder);
        if request.value.is_empty() {
            return match operator {
                Operator::Eq => Ok(builder.is_null(&column)),
                Operator::Ne => Ok(Condition::raw(format!("{} IS NOT NULL", column))),
                _ => Err(Error::InvalidFilter {
                    field: self.name().to_string(),
                    message: format!("operator {} needs a number", operator),
                }),
            };
        }

        let number = self.number(&request.value).ok_or_else(|| Error::InvalidFilter {
            field: self.name().to_string(),
            message: format!("not a number: {:?}", request.value),
        })?;
        Ok(builder.compare(&column, operator, number))
    }

    fn csv_export(&self, value: &FieldValue) -> String {
        self.preview(value)
    }

    fn search_index(&self, value: &FieldValue) -> String {
        self.preview(value)
    }

    fn column_types(&self) -> Vec<ColumnType> {
        let sql_type = if self.integer { "bigint(20)" } else { "double" };
        vec![ColumnType::new(self.name(), sql_type)]
    }

    fn query_column_types(&self) -> Vec<ColumnType> {
        self.column_types()
    }

    fn is_filterable(&self) -> bool {
        true
    }

    fn is_diff_change_allowed(&self) -> bool {
        true
    }
}

impl Normalizable for Numeric {
    fn normalize(&self, value: &FieldValue) -> serde_json::Value {
        match self.number_of(value) {
            Ok(Value::Int64(i)) => serde_json::Value::from(i),
            Ok(Value::Float64(f)) => serde_json::Value::from(f),
            _ => serde_json::Value::Null,
        }
    }

    fn denormalize(
        &self,
        value: &serde_json::Value,
        _ctx: &FieldContext<'_>,
    ) -> Result<FieldValue> {
        let raw = match value {
            serde_json::Value::Null => return Ok(FieldValue::Null),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int64(i),
                None => Value::Float64(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) if s.trim().is_empty() => return Ok(FieldValue::Null),
            serde_json::Value::String(s) => Value::String(s.clone()),
            other => {
                return Err(Error::Deserialization(format!(
                    "field {}: expected a number, got {}",
                    self.name(),
                    other
                )))
            }
        };
        self.number(&raw).map(FieldValue::Scalar).ok_or_else(|| {
            Error::Deserialization(format!("field {}: not a number: {}", self.name(), value))
        })
    }
}

impl DefinitionHooks for Numeric {
    fn pre_save(&self, _providers: &OptionsProviderRegistry) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
            if min > max {
                return Err(Error::Definition {
                    field: self.name().to_string(),
                    message: format!("minValue {} is greater than maxValue {}", min, max),
                });
            }
        }
        Ok(())
    }

    fn synchronize_with_master(&mut self, master: &Self) {
        self.min_value = master.min_value;
        self.max_value = master.max_value;
        self.integer = master.integer;
    }
}

/// Filtered column: the request's name, or the field's own when unnamed.
fn filter_column(field_name: &str, request: &FilterRequest, builder: &ConditionBuilder) -> String {
    let name = if request.name.is_empty() {
        field_name
    } else {
        request.name.as_str()
    };
    builder.column(name, request.brick_prefix.as_deref())
}
