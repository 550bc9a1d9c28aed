//! Object mapper: moves container values through the field types.
//!
//! Load reads the storage row and decodes every eagerly stored field.
//! Relation fields are fetched on first read through their pre-get hook.
//! Save validates every field before anything is written, then writes the
//! storage row, the query columns and the relation rows.

use objdef_proto::{ColumnValue, Condition, FilterRequest, RelationRow, StoredRow, Value};
use tracing::{debug, info};

use crate::catalog::{ClassDefinition, FieldDefinition};
use crate::config::RequestContext;
use crate::container::Container;
use crate::element::ElementResolver;
use crate::error::Result;
use crate::field::{Dependencies, FieldContext, FieldValue, IdMapping, Loaded, StorageValue};
use crate::query::ConditionBuilder;
use crate::storage::{OwnerKey, PersistenceAdapter};

/// Drives load, read, write and save of containers of one class.
pub struct ObjectMapper<'a> {
    class: &'a ClassDefinition,
    store: &'a dyn PersistenceAdapter,
    resolver: &'a dyn ElementResolver,
    request: RequestContext,
}

impl<'a> ObjectMapper<'a> {
    /// Create a mapper with a default request context.
    pub fn new(
        class: &'a ClassDefinition,
        store: &'a dyn PersistenceAdapter,
        resolver: &'a dyn ElementResolver,
    ) -> Self {
        Self {
            class,
            store,
            resolver,
            request: RequestContext::default(),
        }
    }

    /// Use a request context.
    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = request;
        self
    }

    /// The class this mapper serves.
    pub fn class(&self) -> &ClassDefinition {
        self.class
    }

    fn ctx(&self) -> FieldContext<'_> {
        FieldContext::new(self.resolver, &self.request)
    }

    fn apply_loaded(container: &mut dyn Container, name: &str, loaded: Loaded) {
        if loaded.dirty {
            container.mark_field_dirty(name);
        }
        container.set_object_var(name, loaded.value);
        container.mark_lazy_key_loaded(name);
    }

    /// Load the container's storage row.
    ///
    /// Relation fields are left for their first read, except in localized
    /// containers which hold every value eagerly.
    pub fn load(&self, container: &mut dyn Container) -> Result<()> {
        let owner = OwnerKey::for_container(container);
        let row = self.store.fetch_row(&owner)?.unwrap_or_default();
        let ctx = self.ctx();
        let eager_relations = container.kind().is_localized();

        for field in self.class.fields() {
            let field_type = field.field_type();
            let stored = if field_type.is_relation_type() {
                if !eager_relations {
                    continue;
                }
                StorageValue::Relations(self.store.fetch_relations(&owner, field.name())?)
            } else {
                StorageValue::Column(row.column(field.name()).cloned().unwrap_or(Value::Null))
            };
            let loaded = field_type.decode_from_storage(&stored, &ctx)?;
            Self::apply_loaded(container, field.name(), loaded);
        }

        debug!(
            class = self.class.name(),
            object_id = owner.object_id,
            owner_type = ?owner.owner_type,
            "loaded container"
        );
        Ok(())
    }

    /// Current value of a field, running its pre-get hook.
    pub fn get_value(&self, container: &mut dyn Container, name: &str) -> Result<FieldValue> {
        let field = self.class.field(name)?;
        match field.as_lazy_loadable() {
            Some(lazy) => lazy.pre_get_data(container, &self.ctx(), self.store),
            None => Ok(container.get_object_var(name).cloned().unwrap_or_default()),
        }
    }

    /// Set a field, running its pre-set hook. The field counts as loaded.
    pub fn set_value(
        &self,
        container: &mut dyn Container,
        name: &str,
        value: FieldValue,
    ) -> Result<()> {
        let field = self.class.field(name)?;
        let value = match field.as_lazy_loadable() {
            Some(lazy) => lazy.pre_set_data(container, value),
            None => value,
        };
        container.set_object_var(name, value);
        container.mark_lazy_key_loaded(name);
        Ok(())
    }

    /// Fetch every lazily stored field that was not loaded yet.
    pub fn ensure_loaded(&self, container: &mut dyn Container) -> Result<()> {
        let ctx = self.ctx();
        for field in self.class.fields() {
            if let Some(lazy) = field.as_lazy_loadable() {
                lazy.load_lazy(container, &ctx, self.store)?;
            }
        }
        Ok(())
    }

    fn raw_value(container: &dyn Container, field: &FieldDefinition) -> FieldValue {
        container
            .get_object_var(field.name())
            .cloned()
            .unwrap_or_default()
    }

    /// Validate every field of the container.
    pub fn validate(&self, container: &mut dyn Container, skip_mandatory: bool) -> Result<()> {
        self.ensure_loaded(container)?;
        for field in self.class.fields() {
            let value = Self::raw_value(container, field);
            field.field_type().validate(&value, skip_mandatory)?;
        }
        Ok(())
    }

    /// Validate and persist the container.
    ///
    /// Nothing is written when any field fails validation. Returns the stored
    /// row; dirty flags are cleared on success.
    pub fn save(&self, container: &mut dyn Container, skip_mandatory: bool) -> Result<StoredRow> {
        self.validate(container, skip_mandatory)?;

        let owner = OwnerKey::for_container(container);
        let owner_type = owner.owner_type;
        let mut row = StoredRow::new();
        let mut relations: Vec<(&str, Vec<RelationRow>)> = Vec::new();

        for field in self.class.fields() {
            let field_type = field.field_type();
            let value = Self::raw_value(container, field);

            match field_type.encode_for_storage(&value)? {
                StorageValue::Column(v) => row.columns.push(ColumnValue::new(field.name(), v)),
                StorageValue::Relations(rows) => relations.push((
                    field.name(),
                    rows.into_iter()
                        .map(|r| r.with_owner_type(owner_type))
                        .collect(),
                )),
            }
            for (column, v) in field_type.encode_for_query(&value)? {
                row.query_columns.push(ColumnValue::new(column, v));
            }
        }

        for (name, rows) in &relations {
            self.store.write_relations(&owner, name, rows)?;
        }
        self.store.write_row(&owner, &row)?;
        container.clear_dirty();

        info!(
            class = self.class.name(),
            object_id = owner.object_id,
            columns = row.columns.len(),
            relation_fields = relations.len(),
            "saved container"
        );
        Ok(row)
    }

    /// Elements the container's values depend on.
    pub fn dependencies(&self, container: &mut dyn Container) -> Result<Dependencies> {
        self.ensure_loaded(container)?;
        let mut dependencies = Dependencies::new();
        for field in self.class.fields() {
            let value = Self::raw_value(container, field);
            dependencies.extend(field.field_type().resolve_dependencies(&value));
        }
        Ok(dependencies)
    }

    /// Remap referenced ids in every reference field of the container.
    pub fn rewrite_ids(&self, container: &mut dyn Container, mapping: &IdMapping) -> Result<()> {
        self.ensure_loaded(container)?;
        let ctx = self.ctx();
        for field in self.class.fields() {
            if let Some(rewriter) = field.as_id_rewriter() {
                let value = rewriter.rewrite_ids(container, mapping, &ctx);
                container.set_object_var(field.name(), value);
            }
        }
        Ok(())
    }

    /// CSV cells of every field, in declaration order.
    pub fn export_csv(&self, container: &mut dyn Container) -> Result<Vec<(String, String)>> {
        let mut cells = Vec::with_capacity(self.class.fields().len());
        for field in self.class.fields() {
            let value = self.get_value(container, field.name())?;
            cells.push((
                field.name().to_string(),
                field.field_type().csv_export(&value),
            ));
        }
        Ok(cells)
    }

    /// Search index text of the container.
    pub fn search_index(&self, container: &mut dyn Container) -> Result<String> {
        let mut parts = Vec::new();
        for field in self.class.fields() {
            let value = self.get_value(container, field.name())?;
            let text = field.field_type().search_index(&value);
            if !text.is_empty() {
                parts.push(text);
            }
        }
        Ok(parts.join(" "))
    }

    /// Filter condition for a request naming one of the class's fields.
    pub fn filter_condition(
        &self,
        request: &FilterRequest,
        builder: &ConditionBuilder,
    ) -> Result<Condition> {
        let field = self.class.field(&request.name)?;
        builder.filter_condition(field, self.class.name(), request)
    }
}
