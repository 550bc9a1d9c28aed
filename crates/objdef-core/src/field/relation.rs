//! Single reference to an object, asset or document.
//!
//! Values live in the relation table as one `(dest_id, type)` row and are
//! resolved through the [`ElementResolver`](crate::element::ElementResolver)
//! on first read. The query table carries two denormalized columns,
//! `<name>__id` and `<name>__type`.

use std::collections::BTreeMap;

use objdef_proto::{
    Condition, EditorValue, ElementKind, ElementRef, FilterRequest, Operator, RelationRow, Value,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::catalog::{
    allowed_types, normalize_allowed_types, Dimension, FieldCommon, OptionsProviderRegistry,
};
use crate::container::Container;
use crate::element::Element;
use crate::error::{Error, Result, ValidationError};
use crate::query::{unsupported_operator, ConditionBuilder};
use crate::storage::{OwnerKey, PersistenceAdapter};

use super::{
    check_mandatory, escape_html, rewrite_reference, ColumnType, DefinitionHooks, Dependencies,
    DependencyRecord, FieldContext, FieldType, FieldValue, IdMapping, IdRewriter, LazyLoadable,
    Loaded, Normalizable, StorageValue,
};

/// A many-to-one relation field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManyToOneRelation {
    #[serde(flatten)]
    common: FieldCommon,
    #[serde(default)]
    width: Dimension,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    asset_upload_path: String,
    #[serde(default)]
    objects_allowed: bool,
    #[serde(default)]
    assets_allowed: bool,
    #[serde(default)]
    documents_allowed: bool,
    #[serde(default, deserialize_with = "allowed_types")]
    classes: Vec<String>,
    #[serde(default, deserialize_with = "allowed_types")]
    asset_types: Vec<String>,
    #[serde(default, deserialize_with = "allowed_types")]
    document_types: Vec<String>,
}

impl ManyToOneRelation {
    /// Create a relation that allows nothing yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            common: FieldCommon::new(name),
            width: Dimension::default(),
            asset_upload_path: String::new(),
            objects_allowed: false,
            assets_allowed: false,
            documents_allowed: false,
            classes: Vec::new(),
            asset_types: Vec::new(),
            document_types: Vec::new(),
        }
    }

    /// Allow objects of the given classes; no classes means any class.
    pub fn allow_objects<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.objects_allowed = true;
        self.set_classes(classes);
        self
    }

    /// Allow assets of the given types; no types means any type.
    pub fn allow_assets<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.assets_allowed = true;
        self.set_asset_types(types);
        self
    }

    /// Allow documents of the given types; no types means any type.
    pub fn allow_documents<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.documents_allowed = true;
        self.set_document_types(types);
        self
    }

    /// Require a value.
    pub fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.common.set_mandatory(mandatory);
        self
    }

    /// Set the upload target for dropped assets.
    pub fn with_asset_upload_path(mut self, path: impl Into<String>) -> Self {
        self.asset_upload_path = path.into();
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

    pub fn width(&self) -> &Dimension {
        &self.width
    }

    /// Set the layout width; numeric strings become pixels.
    pub fn set_width(&mut self, width: impl Into<Dimension>) {
        self.width = width.into();
    }

    pub fn asset_upload_path(&self) -> &str {
        &self.asset_upload_path
    }

    pub fn set_asset_upload_path(&mut self, path: impl Into<String>) {
        self.asset_upload_path = path.into();
    }

    pub fn objects_allowed(&self) -> bool {
        self.objects_allowed
    }

    pub fn set_objects_allowed(&mut self, allowed: bool) {
        self.objects_allowed = allowed;
    }

    pub fn assets_allowed(&self) -> bool {
        self.assets_allowed
    }

    pub fn set_assets_allowed(&mut self, allowed: bool) {
        self.assets_allowed = allowed;
    }

    pub fn documents_allowed(&self) -> bool {
        self.documents_allowed
    }

    pub fn set_documents_allowed(&mut self, allowed: bool) {
        self.documents_allowed = allowed;
    }

    /// Allowed object classes.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Set the allowed classes; entries are trimmed and deduplicated.
    pub fn set_classes<I, S>(&mut self, classes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.classes = normalize_allowed_types(classes);
    }

    /// Allowed asset types.
    pub fn asset_types(&self) -> &[String] {
        &self.asset_types
    }

    /// Set the allowed asset types; entries are trimmed and deduplicated.
    pub fn set_asset_types<I, S>(&mut self, types: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.asset_types = normalize_allowed_types(types);
    }

    /// Allowed document types.
    pub fn document_types(&self) -> &[String] {
        &self.document_types
    }

    /// Set the allowed document types; entries are trimmed and deduplicated.
    pub fn set_document_types<I, S>(&mut self, types: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.document_types = normalize_allowed_types(types);
    }

    /// Whether the element may be referenced by this field.
    ///
    /// The element's kind must be enabled, and its subtype (class name for
    /// objects) must be in that kind's allowed set. An empty set allows every
    /// subtype.
    pub fn is_allowed(&self, element: &Element) -> bool {
        let (enabled, allowed, subtype) = match element.kind() {
            ElementKind::Object => (
                self.objects_allowed,
                &self.classes,
                element.class_name().unwrap_or_default(),
            ),
            ElementKind::Asset => (self.assets_allowed, &self.asset_types, element.subtype()),
            ElementKind::Document => {
                (self.documents_allowed, &self.document_types, element.subtype())
            }
        };
        enabled && (allowed.is_empty() || allowed.iter().any(|a| a == subtype))
    }

    /// Decode relation rows: the first row wins.
    ///
    /// A row whose target no longer resolves decodes to null and is flagged
    /// dirty so the next save clears it.
    pub fn load_data(&self, rows: &[RelationRow], ctx: &FieldContext<'_>) -> Loaded {
        let row = match rows.first() {
            Some(row) if row.dest_id != 0 => row,
            _ => return Loaded::clean(FieldValue::Null),
        };

        match ctx.resolver.resolve(row.target()) {
            Some(element) => Loaded::clean(FieldValue::Element(element)),
            None => {
                warn!(
                    field = self.name(),
                    kind = %row.kind,
                    id = row.dest_id,
                    "relation target not found, clearing reference"
                );
                Loaded::dangling()
            }
        }
    }

    fn element_of<'v>(
        &self,
        value: &'v FieldValue,
    ) -> std::result::Result<Option<&'v Element>, ValidationError> {
        match value {
            FieldValue::Null => Ok(None),
            FieldValue::Element(e) => Ok(Some(e)),
            _ => Err(ValidationError::invalid_data(self.name(), self.fieldtype())),
        }
    }

    fn reference_of(&self, value: &FieldValue) -> Option<ElementRef> {
        value.as_element().map(Element::reference)
    }

    fn query_column(
        &self,
        request: &FilterRequest,
        suffix: &str,
        builder: &ConditionBuilder,
    ) -> String {
        let name = if request.name.is_empty() {
            self.name()
        } else {
            request.name.as_str()
        };
        builder.column(&format!("{}__{}", name, suffix), request.brick_prefix.as_deref())
    }

    /// Query-table id column value; ids above `i64::MAX` are rejected.
    fn id_value(&self, id: u64) -> std::result::Result<Value, ValidationError> {
        Value::try_from(id).map_err(|_| {
            ValidationError::new(
                self.name(),
                self.fieldtype(),
                format!("Id {} in field [ {} ] is out of range", id, self.name()),
            )
        })
    }

    /// Listing filter on a known target: `` `<name>__id` = ? AND `<name>__type` = ? ``.
    pub fn listing_filter(
        &self,
        target: ElementRef,
        operator: Operator,
        class_name: &str,
        builder: &ConditionBuilder,
    ) -> Result<Condition> {
        if operator != Operator::Eq {
            return Err(unsupported_operator(self.fieldtype(), class_name, operator));
        }
        let id_column = builder.quote_identifier(&format!("{}__id", self.name()));
        let type_column = builder.quote_identifier(&format!("{}__type", self.name()));
        let id = Value::try_from(target.id).map_err(|e| Error::InvalidFilter {
            field: self.name().to_string(),
            message: e.to_string(),
        })?;
        Ok(Condition::new(
            format!("{} = ? AND {} = ?", id_column, type_column),
            vec![id, Value::from(target.kind.as_str())],
        ))
    }

    /// Apply an id mapping to a value and re-resolve the rewritten reference.
    ///
    /// When the new id does not resolve the rewritten handle is kept, so the
    /// caller still sees the remapped identity.
    pub fn rewrite_value(
        &self,
        value: &FieldValue,
        mapping: &IdMapping,
        ctx: &FieldContext<'_>,
    ) -> FieldValue {
        let element = match value {
            FieldValue::Element(e) => e,
            other => return other.clone(),
        };
        let rewritten = rewrite_reference(element.reference(), mapping);
        if rewritten == element.reference() {
            return value.clone();
        }

        debug!(
            field = self.name(),
            from = %element.reference(),
            to = %rewritten,
            "rewrote relation id"
        );
        match ctx.resolver.resolve(rewritten) {
            Some(resolved) => FieldValue::Element(resolved),
            None => FieldValue::Element(element.clone().with_reference(rewritten)),
        }
    }
}

impl FieldType for ManyToOneRelation {
    fn name(&self) -> &str {
        self.common.name()
    }

    fn fieldtype(&self) -> &'static str {
        "manyToOneRelation"
    }

    fn is_mandatory(&self) -> bool {
        self.common.mandatory()
    }

    fn encode_for_storage(&self, value: &FieldValue) -> Result<StorageValue> {
        let rows = match self.element_of(value)? {
            Some(element) => vec![RelationRow::new(self.name(), element.reference())],
            None => Vec::new(),
        };
        Ok(StorageValue::Relations(rows))
    }

    fn decode_from_storage(
        &self,
        stored: &StorageValue,
        ctx: &FieldContext<'_>,
    ) -> Result<Loaded> {
        match stored {
            StorageValue::Relations(rows) => Ok(self.load_data(rows, ctx)),
            StorageValue::Column(v) if v.is_empty() => Ok(Loaded::clean(FieldValue::Null)),
            StorageValue::Column(Value::String(token)) => {
                let target = ElementRef::parse_token(token)?;
                let row = RelationRow::new(self.name(), target);
                Ok(self.load_data(&[row], ctx))
            }
            StorageValue::Column(other) => Err(Error::Deserialization(format!(
                "field {}: unexpected stored value {:?}",
                self.name(),
                other
            ))),
        }
    }

    fn encode_for_query(&self, value: &FieldValue) -> Result<BTreeMap<String, Value>> {
        let reference = self.element_of(value)?.map(Element::reference);
        let mut columns: BTreeMap<String, Value> = BTreeMap::new();
        let id = match reference {
            Some(r) => self.id_value(r.id)?,
            None => Value::Null,
        };
        columns.insert(format!("{}__id", self.name()), id);
        columns.insert(
            format!("{}__type", self.name()),
            reference.map(|r| r.kind.as_str()).into(),
        );
        Ok(columns)
    }

    fn encode_for_editor(&self, value: &FieldValue) -> EditorValue {
        match value {
            FieldValue::Element(e) => EditorValue::Relation(e.to_payload()),
            _ => EditorValue::Null,
        }
    }

    fn decode_from_editor(
        &self,
        payload: &EditorValue,
        ctx: &FieldContext<'_>,
    ) -> Result<FieldValue> {
        let target = match payload {
            EditorValue::Null => return Ok(FieldValue::Null),
            EditorValue::Relation(p) => match (p.id, p.kind) {
                (Some(id), Some(kind)) if id != 0 => ElementRef::new(kind, id),
                _ => return Ok(FieldValue::Null),
            },
            EditorValue::Text(token) if token.is_empty() => return Ok(FieldValue::Null),
            EditorValue::Text(token) => ElementRef::parse_token(token)
                .map_err(|_| ValidationError::invalid_data(self.name(), self.fieldtype()))?,
            _ => return Err(ValidationError::invalid_data(self.name(), self.fieldtype()).into()),
        };
        Ok(ctx.resolver.resolve(target).into())
    }

    fn validate(
        &self,
        value: &FieldValue,
        skip_mandatory: bool,
    ) -> std::result::Result<(), ValidationError> {
        check_mandatory(self, value, skip_mandatory)?;

        let allowed = match value {
            FieldValue::Null => true,
            FieldValue::Element(e) => self.is_allowed(e),
            _ => {
                error!(
                    field = self.name(),
                    fieldtype = self.fieldtype(),
                    "Invalid data in field `{}` [type: {}]",
                    self.name(),
                    self.fieldtype()
                );
                false
            }
        };
        if !allowed {
            return Err(ValidationError::invalid_data(self.name(), self.fieldtype()));
        }
        if let Some(reference) = self.reference_of(value) {
            self.id_value(reference.id)?;
        }
        Ok(())
    }

    fn preview(&self, value: &FieldValue) -> String {
        match value {
            FieldValue::Element(e) => escape_html(&format!("{} {}", e.kind(), e.path())),
            _ => String::new(),
        }
    }

    fn is_equal(&self, a: &FieldValue, b: &FieldValue) -> bool {
        match (a, b) {
            (FieldValue::Null | FieldValue::Element(_), FieldValue::Null | FieldValue::Element(_)) => {
                self.reference_of(a) == self.reference_of(b)
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

        let id_column = self.query_column(request, "id", builder);
        let invalid = || Error::InvalidFilter {
            field: self.name().to_string(),
            message: format!("expected an id or a <kind>|<id> token, got {:?}", request.value),
        };

        match &request.value {
            Value::Null => Ok(builder.is_null(&id_column)),
            Value::String(s) if s.eq_ignore_ascii_case("null") => Ok(builder.is_null(&id_column)),
            Value::String(s) if s.contains('|') => {
                let target = ElementRef::parse_token(s).map_err(|_| invalid())?;
                let type_column = self.query_column(request, "type", builder);
                let type_condition = builder.compare(
                    &type_column,
                    Operator::Eq,
                    Value::from(target.kind.as_str()),
                );
                let id = Value::try_from(target.id).map_err(|_| invalid())?;
                let id_condition = builder.compare(&id_column, Operator::Eq, id);
                Ok(type_condition.and(id_condition))
            }
            value => {
                let id = value.as_i64().filter(|id| *id >= 0).ok_or_else(invalid)?;
                Ok(builder.compare(&id_column, Operator::Eq, Value::Int64(id)))
            }
        }
    }

    fn csv_export(&self, value: &FieldValue) -> String {
        match value {
            FieldValue::Element(e) => format!("{}:{}", e.kind(), e.path()),
            _ => String::new(),
        }
    }

    fn resolve_dependencies(&self, value: &FieldValue) -> Dependencies {
        let mut dependencies = Dependencies::new();
        if let Some(reference) = self.reference_of(value) {
            dependencies.insert(reference.dependency_key(), DependencyRecord::from(reference));
        }
        dependencies
    }

    fn column_types(&self) -> Vec<ColumnType> {
        Vec::new()
    }

    fn query_column_types(&self) -> Vec<ColumnType> {
        vec![
            ColumnType::new(format!("{}__id", self.name()), "int(11)"),
            ColumnType::new(
                format!("{}__type", self.name()),
                "enum('document','asset','object')",
            ),
        ]
    }

    fn is_filterable(&self) -> bool {
        true
    }

    fn is_diff_change_allowed(&self) -> bool {
        true
    }

    fn is_relation_type(&self) -> bool {
        true
    }
}

impl Normalizable for ManyToOneRelation {
    fn normalize(&self, value: &FieldValue) -> serde_json::Value {
        match self.reference_of(value) {
            Some(r) => serde_json::json!({ "type": r.kind.as_str(), "id": r.id }),
            None => serde_json::Value::Null,
        }
    }

    fn denormalize(
        &self,
        value: &serde_json::Value,
        ctx: &FieldContext<'_>,
    ) -> Result<FieldValue> {
        if value.is_null() {
            return Ok(FieldValue::Null);
        }
        let reference: ElementRef = serde_json::from_value(value.clone())?;
        Ok(ctx.resolver.resolve(reference).into())
    }
}

impl LazyLoadable for ManyToOneRelation {
    fn load_lazy(
        &self,
        container: &mut dyn Container,
        ctx: &FieldContext<'_>,
        store: &dyn PersistenceAdapter,
    ) -> Result<()> {
        let name = self.name();
        if container.kind().is_localized() || container.is_lazy_key_loaded(name) {
            return Ok(());
        }

        let owner = OwnerKey::for_container(container);
        let rows = store.fetch_relations(&owner, name)?;
        let loaded = self.load_data(&rows, ctx);
        if loaded.dirty {
            container.mark_field_dirty(name);
        }
        container.set_object_var(name, loaded.value);
        container.mark_lazy_key_loaded(name);
        Ok(())
    }

    fn pre_get_data(
        &self,
        container: &mut dyn Container,
        ctx: &FieldContext<'_>,
        store: &dyn PersistenceAdapter,
    ) -> Result<FieldValue> {
        self.load_lazy(container, ctx, store)?;
        let value = container
            .get_object_var(self.name())
            .cloned()
            .unwrap_or_default();

        if ctx.request.hide_unpublished {
            if let FieldValue::Element(e) = &value {
                if !e.is_published() {
                    return Ok(FieldValue::Null);
                }
            }
        }
        Ok(value)
    }

    fn pre_set_data(&self, container: &mut dyn Container, value: FieldValue) -> FieldValue {
        container.mark_lazy_key_loaded(self.name());
        value
    }
}

impl IdRewriter for ManyToOneRelation {
    fn rewrite_ids(
        &self,
        container: &dyn Container,
        mapping: &IdMapping,
        ctx: &FieldContext<'_>,
    ) -> FieldValue {
        match container.get_object_var(self.name()) {
            Some(value) => self.rewrite_value(value, mapping, ctx),
            None => FieldValue::Null,
        }
    }
}

impl DefinitionHooks for ManyToOneRelation {
    fn pre_save(&self, _providers: &OptionsProviderRegistry) -> Result<()> {
        Ok(())
    }

    fn synchronize_with_master(&mut self, master: &Self) {
        self.asset_upload_path = master.asset_upload_path.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RequestContext;
    use crate::container::ObjectContainer;
    use crate::element::{ElementResolver, MemoryElementStore};
    use crate::storage::MemoryStore;
    use objdef_proto::RelationPayload;

    fn owner_field() -> ManyToOneRelation {
        ManyToOneRelation::new("owner")
            .allow_objects(["Customer"])
            .allow_assets(["image"])
    }

    fn elements() -> MemoryElementStore {
        let store = MemoryElementStore::new();
        store.insert(Element::asset(17, "/images/chair.jpg", "image"));
        store.insert(Element::asset(18, "/videos/intro.mp4", "video"));
        store.insert(Element::object(5, "/customers/acme", "Customer"));
        store.insert(Element::object(6, "/customers/draft", "Customer").with_published(false));
        store.insert(Element::document(3, "/home", "page"));
        store
    }

    #[test]
    fn test_allow_check() {
        let field = owner_field();
        let elements = elements();
        let get = |r| elements.resolve(r).unwrap();

        assert!(field.is_allowed(&get(ElementRef::asset(17))));
        assert!(!field.is_allowed(&get(ElementRef::asset(18))));
        assert!(field.is_allowed(&get(ElementRef::object(5))));
        assert!(!field.is_allowed(&get(ElementRef::document(3))));

        let any_document = ManyToOneRelation::new("link").allow_documents(Vec::<String>::new());
        assert!(any_document.is_allowed(&get(ElementRef::document(3))));
    }

    #[test]
    fn test_validation() {
        let field = owner_field().with_mandatory(true);
        let elements = elements();

        assert_eq!(
            field.validate(&FieldValue::Null, false).unwrap_err().message,
            "Empty mandatory field [ owner ]"
        );
        assert!(field.validate(&FieldValue::Null, true).is_ok());

        let image = elements.resolve(ElementRef::asset(17)).unwrap();
        assert!(field.validate(&image.into(), false).is_ok());

        let page = elements.resolve(ElementRef::document(3)).unwrap();
        let err = field.validate(&page.into(), false).unwrap_err();
        assert_eq!(err.message, "Invalid data in field `owner` [type: manyToOneRelation]");
        assert_eq!(err.field, "owner");
        assert_eq!(err.fieldtype, "manyToOneRelation");

        assert!(field.validate(&FieldValue::text("asset|17"), false).is_err());
    }

    #[test]
    fn test_storage_roundtrip() {
        let field = owner_field();
        let elements = elements();
        let request = RequestContext::new();
        let ctx = FieldContext::new(&elements, &request);

        let image = FieldValue::from(elements.resolve(ElementRef::asset(17)));
        let stored = field.encode_for_storage(&image).unwrap();
        assert_eq!(
            stored,
            StorageValue::Relations(vec![RelationRow::new("owner", ElementRef::asset(17))])
        );

        let loaded = field.decode_from_storage(&stored, &ctx).unwrap();
        assert!(!loaded.dirty);
        assert!(field.is_equal(&loaded.value, &image));

        assert_eq!(
            field.encode_for_storage(&FieldValue::Null).unwrap(),
            StorageValue::Relations(vec![])
        );
        let empty = field.decode_from_storage(&StorageValue::Column(Value::from("")), &ctx).unwrap();
        assert_eq!(empty, Loaded::clean(FieldValue::Null));
    }

    #[test]
    fn test_dangling_reference() {
        let field = owner_field();
        let elements = elements();
        let request = RequestContext::new();
        let ctx = FieldContext::new(&elements, &request);

        let rows = vec![RelationRow::new("owner", ElementRef::object(42))];
        let loaded = field.load_data(&rows, &ctx);
        assert_eq!(loaded, Loaded::dangling());
    }

    #[test]
    fn test_query_columns() {
        let field = owner_field();
        let elements = elements();
        let image = FieldValue::from(elements.resolve(ElementRef::asset(17)));

        let columns = field.encode_for_query(&image).unwrap();
        assert_eq!(columns["owner__id"], Value::Int64(17));
        assert_eq!(columns["owner__type"], Value::from("asset"));

        let columns = field.encode_for_query(&FieldValue::Null).unwrap();
        assert_eq!(columns["owner__id"], Value::Null);
        assert_eq!(columns["owner__type"], Value::Null);

        assert!(field.column_types().is_empty());
        assert_eq!(
            field.query_column_types(),
            vec![
                ColumnType::new("owner__id", "int(11)"),
                ColumnType::new("owner__type", "enum('document','asset','object')"),
            ]
        );
    }

    #[test]
    fn test_editor_roundtrip() {
        let field = owner_field();
        let elements = elements();
        let request = RequestContext::new();
        let ctx = FieldContext::new(&elements, &request);

        let image = FieldValue::from(elements.resolve(ElementRef::asset(17)));
        let payload = field.encode_for_editor(&image);
        match &payload {
            EditorValue::Relation(p) => {
                assert_eq!(p.id, Some(17));
                assert_eq!(p.path, "/images/chair.jpg");
                assert_eq!(p.subtype, "image");
                assert_eq!(p.kind, Some(ElementKind::Asset));
                assert!(p.published);
            }
            other => panic!("unexpected payload {:?}", other),
        }
        let decoded = field.decode_from_editor(&payload, &ctx).unwrap();
        assert!(field.is_equal(&decoded, &image));

        let incomplete = EditorValue::Relation(RelationPayload {
            id: Some(17),
            ..Default::default()
        });
        assert_eq!(field.decode_from_editor(&incomplete, &ctx).unwrap(), FieldValue::Null);

        let token = EditorValue::Text("asset|17".into());
        assert!(field.is_equal(&field.decode_from_grid_editor(&token, &ctx).unwrap(), &image));
    }

    #[test]
    fn test_filter_conditions() {
        let field = owner_field();
        let builder = ConditionBuilder::default();

        let cond = field
            .build_filter_condition(&FilterRequest::eq("owner", "asset|17"), "Product", &builder)
            .unwrap();
        assert_eq!(cond.sql, "(`owner__type` = ? AND `owner__id` = ?)");
        assert_eq!(cond.to_inline_sql(), "(`owner__type` = 'asset' AND `owner__id` = 17)");

        let cond = field
            .build_filter_condition(&FilterRequest::eq("owner", "42"), "Product", &builder)
            .unwrap();
        assert_eq!(cond.to_inline_sql(), "`owner__id` = 42");

        let cond = field
            .build_filter_condition(&FilterRequest::eq("owner", Value::Null), "Product", &builder)
            .unwrap();
        assert_eq!(cond.sql, "`owner__id` IS NULL");

        let err = field
            .build_filter_condition(
                &FilterRequest::new("owner", Operator::Gt, "17"),
                "Product",
                &builder,
            )
            .unwrap_err();
        match err {
            Error::UnsupportedOperator {
                fieldtype,
                class,
                operator,
            } => {
                assert_eq!(fieldtype, "manyToOneRelation");
                assert_eq!(class, "Product");
                assert_eq!(operator, ">");
            }
            other => panic!("unexpected error {:?}", other),
        }

        assert!(matches!(
            field.build_filter_condition(&FilterRequest::eq("owner", "chair"), "Product", &builder),
            Err(Error::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_listing_filter() {
        let field = owner_field();
        let builder = ConditionBuilder::default();
        let cond = field
            .listing_filter(ElementRef::object(5), Operator::Eq, "Product", &builder)
            .unwrap();
        assert_eq!(cond.to_inline_sql(), "`owner__id` = 5 AND `owner__type` = 'object'");
        assert!(field
            .listing_filter(ElementRef::object(5), Operator::Ne, "Product", &builder)
            .is_err());
    }

    #[test]
    fn test_ids_beyond_signed_range() {
        let field = owner_field();
        let builder = ConditionBuilder::default();
        let huge = u64::MAX - 5;
        let elements = elements();
        elements.insert(Element::asset(huge, "/images/huge.jpg", "image"));
        let image = elements.resolve(ElementRef::asset(huge)).unwrap();
        let value = FieldValue::from(image);

        let err = field.validate(&value, false).unwrap_err();
        assert_eq!(err.field, "owner");
        assert_eq!(err.fieldtype, "manyToOneRelation");
        assert_eq!(
            err.message,
            format!("Id {} in field [ owner ] is out of range", huge)
        );
        assert!(matches!(
            field.encode_for_query(&value),
            Err(Error::Validation(_))
        ));

        let token = format!("asset|{}", huge);
        assert!(matches!(
            field.build_filter_condition(&FilterRequest::eq("owner", token), "Product", &builder),
            Err(Error::InvalidFilter { .. })
        ));
        assert!(matches!(
            field.build_filter_condition(
                &FilterRequest::eq("owner", huge.to_string()),
                "Product",
                &builder
            ),
            Err(Error::InvalidFilter { .. })
        ));
        assert!(matches!(
            field.listing_filter(ElementRef::asset(huge), Operator::Eq, "Product", &builder),
            Err(Error::InvalidFilter { .. })
        ));

        let max = i64::MAX as u64;
        let cond = field
            .listing_filter(ElementRef::asset(max), Operator::Eq, "Product", &builder)
            .unwrap();
        assert_eq!(
            cond.to_inline_sql(),
            format!("`owner__id` = {} AND `owner__type` = 'asset'", max)
        );
    }

    #[test]
    fn test_previews_and_dependencies() {
        let field = owner_field();
        let elements = elements();
        let image = FieldValue::from(elements.resolve(ElementRef::asset(17)));

        assert_eq!(field.preview(&image), "asset /images/chair.jpg");
        assert_eq!(field.csv_export(&image), "asset:/images/chair.jpg");
        assert_eq!(field.preview(&FieldValue::Null), "");

        let deps = field.resolve_dependencies(&image);
        assert_eq!(deps.len(), 1);
        assert_eq!(
            deps["asset_17"],
            DependencyRecord {
                id: 17,
                kind: ElementKind::Asset
            }
        );
        assert!(field.resolve_dependencies(&FieldValue::Null).is_empty());
    }

    #[test]
    fn test_rewrite_ids() {
        let field = owner_field();
        let elements = elements();
        elements.insert(Element::asset(170, "/images/chair-copy.jpg", "image"));
        let request = RequestContext::new();
        let ctx = FieldContext::new(&elements, &request);

        let mut container = ObjectContainer::new("Product", 1);
        container.set_object_var("owner", elements.resolve(ElementRef::asset(17)).into());

        let mapping = IdMapping::new().with(ElementKind::Asset, 17, 170);
        let rewritten = field.rewrite_ids(&container, &mapping, &ctx);
        assert_eq!(rewritten.as_element().unwrap().path(), "/images/chair-copy.jpg");

        let unmapped = IdMapping::new().with(ElementKind::Object, 17, 99);
        let same = field.rewrite_ids(&container, &unmapped, &ctx);
        assert_eq!(same.as_element().unwrap().reference(), ElementRef::asset(17));

        let dangling = IdMapping::new().with(ElementKind::Asset, 17, 999);
        let kept = field.rewrite_ids(&container, &dangling, &ctx);
        assert_eq!(kept.as_element().unwrap().reference(), ElementRef::asset(999));
    }

    #[test]
    fn test_normal_form() {
        let field = owner_field();
        let elements = elements();
        let request = RequestContext::new();
        let ctx = FieldContext::new(&elements, &request);

        let image = FieldValue::from(elements.resolve(ElementRef::asset(17)));
        let json = field.normalize(&image);
        assert_eq!(json, serde_json::json!({"type": "asset", "id": 17}));
        assert!(field.is_equal(&field.denormalize(&json, &ctx).unwrap(), &image));
        assert_eq!(field.normalize(&FieldValue::Null), serde_json::Value::Null);
        assert!(field.denormalize(&serde_json::json!({"type": "thing", "id": 1}), &ctx).is_err());
    }

    #[test]
    fn test_lazy_load_once() {
        let field = owner_field();
        let elements = elements();
        let request = RequestContext::new();
        let ctx = FieldContext::new(&elements, &request);
        let store = MemoryStore::new();
        store
            .write_relations(
                &OwnerKey::object("Product", 1),
                "owner",
                &[RelationRow::new("owner", ElementRef::asset(17))],
            )
            .unwrap();

        let mut container = ObjectContainer::new("Product", 1);
        let first = field.pre_get_data(&mut container, &ctx, &store).unwrap();
        let second = field.pre_get_data(&mut container, &ctx, &store).unwrap();
        assert_eq!(first.as_element().unwrap().id(), 17);
        assert_eq!(first, second);
        assert_eq!(store.relation_fetches(), 1);
        assert!(container.is_lazy_key_loaded("owner"));
    }

    #[test]
    fn test_lazy_load_dangling_marks_dirty() {
        let field = owner_field();
        let elements = elements();
        let request = RequestContext::new();
        let ctx = FieldContext::new(&elements, &request);
        let store = MemoryStore::new();
        store
            .write_relations(
                &OwnerKey::object("Product", 1),
                "owner",
                &[RelationRow::new("owner", ElementRef::object(42))],
            )
            .unwrap();

        let mut container = ObjectContainer::new("Product", 1);
        let value = field.pre_get_data(&mut container, &ctx, &store).unwrap();
        assert_eq!(value, FieldValue::Null);
        assert!(container.is_field_dirty("owner"));
    }

    #[test]
    fn test_hide_unpublished() {
        let field = owner_field();
        let elements = elements();
        let store = MemoryStore::new();
        store
            .write_relations(
                &OwnerKey::object("Product", 1),
                "owner",
                &[RelationRow::new("owner", ElementRef::object(6))],
            )
            .unwrap();

        let hidden = RequestContext::new().with_hide_unpublished(true);
        let ctx = FieldContext::new(&elements, &hidden);
        let mut container = ObjectContainer::new("Product", 1);
        assert_eq!(field.pre_get_data(&mut container, &ctx, &store).unwrap(), FieldValue::Null);
        assert!(!container.is_dirty());

        let visible = RequestContext::new();
        let ctx = FieldContext::new(&elements, &visible);
        let value = field.pre_get_data(&mut container, &ctx, &store).unwrap();
        assert_eq!(value.as_element().unwrap().id(), 6);
    }

    #[test]
    fn test_pre_set_marks_loaded() {
        let field = owner_field();
        let elements = elements();
        let request = RequestContext::new();
        let ctx = FieldContext::new(&elements, &request);
        let store = MemoryStore::new();

        let mut container = ObjectContainer::new("Product", 1);
        let value = field.pre_set_data(&mut container, FieldValue::Null);
        container.set_object_var("owner", value);
        assert!(container.is_lazy_key_loaded("owner"));

        field.pre_get_data(&mut container, &ctx, &store).unwrap();
        assert_eq!(store.relation_fetches(), 0);
    }

    #[test]
    fn test_localized_container_is_not_fetched() {
        let field = owner_field();
        let elements = elements();
        let request = RequestContext::new();
        let ctx = FieldContext::new(&elements, &request);
        let store = MemoryStore::new();

        let mut container = ObjectContainer::localized("Product", 1, "en");
        container.set_object_var("owner", elements.resolve(ElementRef::asset(17)).into());
        let value = field.pre_get_data(&mut container, &ctx, &store).unwrap();
        assert_eq!(value.as_element().unwrap().id(), 17);
        assert_eq!(store.relation_fetches(), 0);
    }
}
