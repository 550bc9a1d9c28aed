//! Multiple selection from an option catalog.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use objdef_proto::{Condition, EditorValue, FilterRequest, GridPayload, Operator, SelectOption, Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::{
    lenient_u32, parse_integer_cast, Dimension, FieldCommon, OptionsContext, OptionsProvider,
    OptionsProviderRegistry,
};
use crate::config::RequestContext;
use crate::error::{Error, Result, ValidationError};
use crate::query::{unsupported_operator, ConditionBuilder};

use super::{
    check_mandatory, escape_html, ColumnType, DefinitionHooks, FieldContext, FieldType,
    FieldValue, Loaded, Normalizable, SetAlgebra, StorageValue,
};

/// Separator of selected values in storage, query and editor forms.
pub const MULTISELECT_DELIMITER: char = ',';

/// A multiselect field definition.
///
/// Values are lists of option values. Storage joins them with
/// [`MULTISELECT_DELIMITER`]; the query column wraps the joined list in
/// delimiters so a single `LIKE '%,value,%'` matches whole members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Multiselect {
    #[serde(flatten)]
    common: FieldCommon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Vec<SelectOption>>,
    #[serde(default)]
    width: Dimension,
    #[serde(default)]
    height: Dimension,
    #[serde(
        default,
        deserialize_with = "lenient_u32",
        skip_serializing_if = "Option::is_none"
    )]
    max_items: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    render_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options_provider_class: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    options_provider_data: String,
    #[serde(default)]
    dynamic_options: bool,
}

impl Multiselect {
    /// Create a multiselect field without options.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            common: FieldCommon::new(name),
            options: None,
            width: Dimension::default(),
            height: Dimension::default(),
            max_items: None,
            render_type: None,
            options_provider_class: None,
            options_provider_data: String::new(),
            dynamic_options: false,
        }
    }

    /// Set the static option catalog.
    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = Some(options);
        self
    }

    /// Require a value.
    pub fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.common.set_mandatory(mandatory);
        self
    }

    /// Limit the number of selected values.
    pub fn with_max_items(mut self, max_items: u32) -> Self {
        self.max_items = Some(max_items);
        self
    }

    /// Name the options provider.
    pub fn with_options_provider_class(mut self, class: impl Into<String>) -> Self {
        self.set_options_provider_class(Some(class.into()));
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

    /// Static option catalog.
    pub fn options(&self) -> Option<&[SelectOption]> {
        self.options.as_deref()
    }

    /// Replace the static option catalog.
    pub fn set_options(&mut self, options: Option<Vec<SelectOption>>) {
        self.options = options;
    }

    /// Layout width.
    pub fn width(&self) -> &Dimension {
        &self.width
    }

    /// Set the layout width; numeric strings become pixels.
    pub fn set_width(&mut self, width: impl Into<Dimension>) {
        self.width = width.into();
    }

    /// Layout height.
    pub fn height(&self) -> &Dimension {
        &self.height
    }

    /// Set the layout height; numeric strings become pixels.
    pub fn set_height(&mut self, height: impl Into<Dimension>) {
        self.height = height.into();
    }

    /// Maximum number of selected values.
    pub fn max_items(&self) -> Option<u32> {
        self.max_items
    }

    /// Set the maximum number of selected values.
    pub fn set_max_items(&mut self, max_items: Option<u32>) {
        self.max_items = max_items;
    }

    /// Set the maximum from raw input; empty or non-numeric means unset.
    pub fn set_max_items_from_str(&mut self, raw: &str) {
        self.max_items = parse_integer_cast(raw);
    }

    /// Render type hint for the editor.
    pub fn render_type(&self) -> Option<&str> {
        self.render_type.as_deref()
    }

    /// Set the render type hint.
    pub fn set_render_type(&mut self, render_type: Option<String>) {
        self.render_type = render_type;
    }

    /// Options provider name.
    pub fn options_provider_class(&self) -> Option<&str> {
        self.options_provider_class.as_deref()
    }

    /// Set the options provider name; blank means none.
    pub fn set_options_provider_class(&mut self, class: Option<String>) {
        self.options_provider_class = class
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
    }

    /// Opaque data handed to the options provider.
    pub fn options_provider_data(&self) -> &str {
        &self.options_provider_data
    }

    /// Set the provider data.
    pub fn set_options_provider_data(&mut self, data: impl Into<String>) {
        self.options_provider_data = data.into();
    }

    fn provider(&self, providers: &OptionsProviderRegistry) -> Option<Arc<dyn OptionsProvider>> {
        providers.resolve(self.options_provider_class.as_deref())
    }

    /// Ask a provider for options; a failing provider yields `None`.
    fn provider_options(
        &self,
        provider: &dyn OptionsProvider,
        context: &OptionsContext,
    ) -> Option<Vec<SelectOption>> {
        match provider.get_options(context, self) {
            Ok(options) => Some(options),
            Err(e) => {
                warn!(
                    field = self.name(),
                    provider = %e.provider,
                    error = %e.message,
                    "options provider failed, continuing without options"
                );
                None
            }
        }
    }

    fn items<'v>(&self, value: &'v FieldValue) -> std::result::Result<&'v [String], ValidationError> {
        match value {
            FieldValue::Null => Ok(&[]),
            FieldValue::List(items) => Ok(items.as_slice()),
            _ => Err(ValidationError::invalid_data(self.name(), self.fieldtype())),
        }
    }

    fn joined(&self, value: &FieldValue) -> std::result::Result<Option<String>, ValidationError> {
        let items = self.items(value)?;
        if items.is_empty() {
            return Ok(None);
        }
        Ok(Some(items.join(&MULTISELECT_DELIMITER.to_string())))
    }

    fn split(raw: &str) -> FieldValue {
        if raw.is_empty() {
            return FieldValue::Null;
        }
        FieldValue::List(raw.split(MULTISELECT_DELIMITER).map(str::to_string).collect())
    }

    /// Grid payload of a value.
    ///
    /// Without a registered options provider this is the editor payload. With
    /// one, the provider is consulted for the row's object and the payload
    /// carries the options next to the value, unless `purpose` is `editmode`.
    pub fn data_for_grid(
        &self,
        value: &FieldValue,
        object: Option<(u64, &str)>,
        providers: &OptionsProviderRegistry,
        purpose: Option<&str>,
    ) -> EditorValue {
        let provider = match self.provider(providers) {
            Some(provider) => provider,
            None => return self.encode_for_editor(value),
        };

        let mut context = OptionsContext::for_field(self.name());
        if let Some((id, class)) = object {
            context = context.with_object(id, class);
        }
        if let Some(purpose) = purpose {
            context = context.with_purpose(purpose);
        }
        let options = self
            .provider_options(provider.as_ref(), &context)
            .unwrap_or_default();

        if purpose == Some("editmode") {
            return self.encode_for_editor(value);
        }
        EditorValue::Grid(GridPayload {
            value: self.joined(value).ok().flatten(),
            options,
        })
    }

    /// Replace the option catalog with what the provider supplies for a
    /// context. Leaves the catalog untouched without a provider or when the
    /// provider fails.
    pub fn enrich_field_definition(
        &mut self,
        providers: &OptionsProviderRegistry,
        context: &OptionsContext,
    ) {
        let provider = match self.provider(providers) {
            Some(provider) => provider,
            None => return,
        };
        if let Some(options) = self.provider_options(provider.as_ref(), context) {
            debug!(
                field = self.name(),
                options = options.len(),
                "enriched field definition"
            );
            self.options = Some(options);
        }
    }

    /// Copy of the definition for serialization; provider-supplied options
    /// are dropped when the request asks for it.
    pub fn for_serialization(&self, request: &RequestContext) -> Multiselect {
        let mut copy = self.clone();
        if copy.options_provider_class.is_some() && request.remove_dynamic_options {
            copy.options = None;
        }
        copy
    }

    /// HTML list of the keys of the selected options, in catalog order.
    pub fn diff_preview(&self, value: &FieldValue) -> String {
        let items = match self.items(value) {
            Ok(items) if !items.is_empty() => items,
            _ => return String::new(),
        };
        let selected: HashSet<&str> = items.iter().map(String::as_str).collect();

        let mut html = String::from("<ul>");
        for option in self.options.iter().flatten() {
            if selected.contains(option.value.as_str()) {
                html.push_str("<li>");
                html.push_str(&escape_html(&option.key));
                html.push_str("</li>");
            }
        }
        html.push_str("</ul>");
        html
    }
}

fn dedupe(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

impl FieldType for Multiselect {
    fn name(&self) -> &str {
        self.common.name()
    }

    fn fieldtype(&self) -> &'static str {
        "multiselect"
    }

    fn is_mandatory(&self) -> bool {
        self.common.mandatory()
    }

    fn encode_for_storage(&self, value: &FieldValue) -> Result<StorageValue> {
        Ok(StorageValue::Column(self.joined(value)?.into()))
    }

    fn decode_from_storage(
        &self,
        stored: &StorageValue,
        _ctx: &FieldContext<'_>,
    ) -> Result<Loaded> {
        match stored {
            StorageValue::Column(v) => Ok(Loaded::clean(
                v.to_text().map(|s| Self::split(&s)).unwrap_or_default(),
            )),
            StorageValue::Relations(_) => Err(Error::Deserialization(format!(
                "field {} is not stored in the relation table",
                self.name()
            ))),
        }
    }

    fn encode_for_query(&self, value: &FieldValue) -> Result<BTreeMap<String, Value>> {
        let wrapped = self
            .joined(value)?
            .map(|joined| format!("{d}{}{d}", joined, d = MULTISELECT_DELIMITER));
        let mut columns: BTreeMap<String, Value> = BTreeMap::new();
        columns.insert(self.name().to_string(), wrapped.into());
        Ok(columns)
    }

    fn encode_for_editor(&self, value: &FieldValue) -> EditorValue {
        match self.joined(value) {
            Ok(Some(joined)) => EditorValue::Text(joined),
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
            EditorValue::Text(s) => Ok(Self::split(s)),
            EditorValue::Grid(grid) => Ok(grid.value.as_deref().map(Self::split).unwrap_or_default()),
            _ => Err(ValidationError::invalid_data(self.name(), self.fieldtype()).into()),
        }
    }

    fn validate(
        &self,
        value: &FieldValue,
        skip_mandatory: bool,
    ) -> std::result::Result<(), ValidationError> {
        check_mandatory(self, value, skip_mandatory)?;
        let items = self.items(value)?;
        if let Some(max) = self.max_items {
            if items.len() > max as usize {
                return Err(ValidationError::new(
                    self.name(),
                    self.fieldtype(),
                    format!(
                        "Field [ {} ] allows at most {} selected items",
                        self.name(),
                        max
                    ),
                ));
            }
        }
        Ok(())
    }

    fn preview(&self, value: &FieldValue) -> String {
        self.items(value)
            .map(|items| {
                items
                    .iter()
                    .map(|v| escape_html(v))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default()
    }

    fn is_equal(&self, a: &FieldValue, b: &FieldValue) -> bool {
        match (self.items(a), self.items(b)) {
            (Ok(a), Ok(b)) => {
                let a: BTreeSet<&String> = a.iter().collect();
                let b: BTreeSet<&String> = b.iter().collect();
                a == b
            }
            _ => a == b,
        }
    }

    fn build_filter_condition(
        &self,
        request: &FilterRequest,
        class_name: &str,
        builder: &ConditionBuilder,
    ) -> Result<Condition> {
        if request.operator != Operator::Eq {
            return Err(unsupported_operator(self.fieldtype(), class_name, request.operator));
        }
        let member = request.value.to_text().ok_or_else(|| Error::InvalidFilter {
            field: self.name().to_string(),
            message: "a value is required".into(),
        })?;

        let name = if request.name.is_empty() {
            self.name()
        } else {
            request.name.as_str()
        };
        let column = builder.column(name, request.brick_prefix.as_deref());
        Ok(builder.contains_member(&column, &member))
    }

    fn csv_export(&self, value: &FieldValue) -> String {
        self.joined(value).ok().flatten().unwrap_or_default()
    }

    fn search_index(&self, value: &FieldValue) -> String {
        self.items(value).map(|items| items.join(" ")).unwrap_or_default()
    }

    fn column_types(&self) -> Vec<ColumnType> {
        vec![ColumnType::new(self.name(), "text")]
    }

    fn query_column_types(&self) -> Vec<ColumnType> {
        vec![ColumnType::new(self.name(), "text")]
    }

    fn is_filterable(&self) -> bool {
        true
    }

    fn is_diff_change_allowed(&self) -> bool {
        true
    }
}

impl SetAlgebra for Multiselect {
    fn append_values(&self, existing: &FieldValue, additional: &[String]) -> FieldValue {
        let current = existing.as_list().unwrap_or_default();
        FieldValue::List(dedupe(current.iter().chain(additional).cloned()))
    }

    fn remove_values(&self, existing: &FieldValue, remove: &[String]) -> FieldValue {
        let current = existing.as_list().unwrap_or_default();
        FieldValue::List(dedupe(
            current.iter().filter(|v| !remove.contains(v)).cloned(),
        ))
    }
}

impl Normalizable for Multiselect {
    fn normalize(&self, value: &FieldValue) -> serde_json::Value {
        match self.items(value) {
            Ok(items) if !items.is_empty() => serde_json::Value::from(items.to_vec()),
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
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        Error::Deserialization(format!(
                            "field {}: expected string items, got {}",
                            self.name(),
                            item
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(FieldValue::List),
            other => Err(Error::Deserialization(format!(
                "field {}: expected an array, got {}",
                self.name(),
                other
            ))),
        }
    }
}

impl DefinitionHooks for Multiselect {
    fn pre_save(&self, providers: &OptionsProviderRegistry) -> Result<()> {
        let options = match self.provider(providers) {
            Some(provider) => {
                self.provider_options(provider.as_ref(), &OptionsContext::for_field(self.name()))
            }
            None => self.options.clone(),
        };

        let has_delimiter = options
            .iter()
            .flatten()
            .any(|option| option.value.contains(MULTISELECT_DELIMITER));
        if has_delimiter {
            return Err(ValidationError::new(
                self.name(),
                self.fieldtype(),
                format!(
                    "Field {}: Multiselect option values may not contain commas (,)",
                    self.name()
                ),
            )
            .into());
        }
        Ok(())
    }

    fn synchronize_with_master(&mut self, master: &Self) {
        self.max_items = master.max_items;
        self.options = master.options.clone();
    }
}
