//! Integration tests for the object mapper.

use std::sync::Arc;

use objdef_core::catalog::{OptionsProviderRegistry, StaticOptionsProvider};
use objdef_core::field::{IdMapping, Input, ManyToOneRelation, Multiselect, Numeric};
use objdef_core::storage::OwnerKey;
use objdef_core::{
    ClassDefinition, ConditionBuilder, Container, Element, ElementResolver, EngineConfig, Error,
    FieldValue, MemoryElementStore, MemoryStore, ObjectContainer, ObjectMapper, PersistenceAdapter,
    RequestContext,
};
use objdef_proto::{
    ElementKind, ElementRef, FilterRequest, Operator, OwnerType, RelationRow, SelectOption, Value,
};

struct TestContext {
    class: ClassDefinition,
    store: MemoryStore,
    elements: MemoryElementStore,
}

impl TestContext {
    fn new() -> Self {
        let elements = MemoryElementStore::new();
        elements.insert(Element::asset(17, "/images/chair.jpg", "image"));
        elements.insert(Element::asset(170, "/images/chair-copy.jpg", "image"));
        elements.insert(Element::object(5, "/customers/acme", "Customer"));
        elements.insert(Element::object(6, "/customers/draft", "Customer").with_published(false));

        Self {
            class: product_class(),
            store: MemoryStore::new(),
            elements,
        }
    }

    fn mapper(&self) -> ObjectMapper<'_> {
        ObjectMapper::new(&self.class, &self.store, &self.elements)
    }

    fn element(&self, reference: ElementRef) -> FieldValue {
        FieldValue::from(self.elements.resolve(reference))
    }
}

fn color_options() -> Vec<SelectOption> {
    vec![
        SelectOption::new("Red", "red"),
        SelectOption::new("Blue", "blue"),
        SelectOption::new("Green", "green"),
    ]
}

fn product_class() -> ClassDefinition {
    ClassDefinition::new("Product")
        .with_field(Input::new("title").with_mandatory(true))
        .with_field(Numeric::new("price").with_range(Some(0.0), None))
        .with_field(
            Multiselect::new("colors")
                .with_options(color_options())
                .with_max_items(2),
        )
        .with_field(
            ManyToOneRelation::new("owner")
                .allow_objects(["Customer"])
                .allow_assets(["image"]),
        )
}

fn filled_product(ctx: &TestContext, id: u64) -> ObjectContainer {
    let mapper = ctx.mapper();
    let mut product = ObjectContainer::new("Product", id);
    mapper.set_value(&mut product, "title", FieldValue::text("Chair")).unwrap();
    mapper
        .set_value(&mut product, "price", FieldValue::Scalar(Value::Float64(9.5)))
        .unwrap();
    mapper
        .set_value(&mut product, "colors", FieldValue::list(["red", "blue"]))
        .unwrap();
    mapper
        .set_value(&mut product, "owner", ctx.element(ElementRef::asset(17)))
        .unwrap();
    product
}

#[test]
fn test_save_writes_storage_and_query_columns() {
    let ctx = TestContext::new();
    let mut product = filled_product(&ctx, 1);

    let row = ctx.mapper().save(&mut product, false).unwrap();

    assert_eq!(row.column("title"), Some(&Value::from("Chair")));
    assert_eq!(row.column("colors"), Some(&Value::from("red,blue")));
    assert!(row.column("owner").is_none());
    assert_eq!(row.query_column("colors"), Some(&Value::from(",red,blue,")));
    assert_eq!(row.query_column("owner__id"), Some(&Value::Int64(17)));
    assert_eq!(row.query_column("owner__type"), Some(&Value::from("asset")));

    let owner = OwnerKey::object("Product", 1);
    let relations = ctx.store.fetch_relations(&owner, "owner").unwrap();
    assert_eq!(relations, vec![RelationRow::new("owner", ElementRef::asset(17))]);
    assert_eq!(ctx.store.row_count(), 1);
}

#[test]
fn test_load_roundtrip_fetches_relation_on_first_read() {
    let ctx = TestContext::new();
    let mut product = filled_product(&ctx, 1);
    ctx.mapper().save(&mut product, false).unwrap();
    let fetches_after_save = ctx.store.relation_fetches();

    let mapper = ctx.mapper();
    let mut loaded = ObjectContainer::new("Product", 1);
    mapper.load(&mut loaded).unwrap();

    assert_eq!(mapper.get_value(&mut loaded, "title").unwrap(), FieldValue::text("Chair"));
    let colors = mapper.get_value(&mut loaded, "colors").unwrap();
    assert_eq!(colors, FieldValue::list(["red", "blue"]));
    let price = mapper.get_value(&mut loaded, "price").unwrap();
    assert_eq!(price.as_scalar().and_then(Value::as_f64), Some(9.5));

    assert!(!loaded.is_lazy_key_loaded("owner"));
    assert_eq!(ctx.store.relation_fetches(), fetches_after_save);

    let owner = mapper.get_value(&mut loaded, "owner").unwrap();
    let again = mapper.get_value(&mut loaded, "owner").unwrap();
    assert_eq!(owner.as_element().map(Element::id), Some(17));
    assert_eq!(owner, again);
    assert_eq!(ctx.store.relation_fetches(), fetches_after_save + 1);
}

#[test]
fn test_save_is_idempotent() {
    let ctx = TestContext::new();
    let mut product = filled_product(&ctx, 1);
    let first = ctx.mapper().save(&mut product, false).unwrap();

    let mut loaded = ObjectContainer::new("Product", 1);
    ctx.mapper().load(&mut loaded).unwrap();
    let second = ctx.mapper().save(&mut loaded, false).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_empty_values_store_null() {
    let ctx = TestContext::new();
    let mapper = ctx.mapper();
    let mut product = ObjectContainer::new("Product", 2);
    mapper.set_value(&mut product, "title", FieldValue::text("Stool")).unwrap();
    mapper.set_value(&mut product, "colors", FieldValue::List(vec![])).unwrap();

    let row = mapper.save(&mut product, false).unwrap();
    assert_eq!(row.column("colors"), Some(&Value::Null));
    assert_eq!(row.query_column("colors"), Some(&Value::Null));
    assert_eq!(row.query_column("owner__id"), Some(&Value::Null));

    let mut loaded = ObjectContainer::new("Product", 2);
    mapper.load(&mut loaded).unwrap();
    assert_eq!(mapper.get_value(&mut loaded, "colors").unwrap(), FieldValue::Null);
    assert_eq!(mapper.get_value(&mut loaded, "owner").unwrap(), FieldValue::Null);
}

#[test]
fn test_mandatory_check_and_skip() {
    let ctx = TestContext::new();
    let mapper = ctx.mapper();
    let mut product = ObjectContainer::new("Product", 3);

    let err = mapper.save(&mut product, false).unwrap_err();
    match err {
        Error::Validation(e) => {
            assert_eq!(e.field, "title");
            assert_eq!(e.fieldtype, "input");
            assert_eq!(e.message, "Empty mandatory field [ title ]");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(ctx.store.row_count(), 0);

    mapper.save(&mut product, true).unwrap();
    assert_eq!(ctx.store.row_count(), 1);
}

#[test]
fn test_failed_validation_writes_nothing() {
    let ctx = TestContext::new();
    let mapper = ctx.mapper();
    let mut product = filled_product(&ctx, 4);
    mapper
        .set_value(&mut product, "colors", FieldValue::list(["red", "blue", "green"]))
        .unwrap();

    let err = mapper.save(&mut product, false).unwrap_err();
    assert!(err.to_string().contains("allows at most 2 selected items"));
    assert_eq!(ctx.store.row_count(), 0);
    let owner = OwnerKey::object("Product", 4);
    assert!(ctx.store.fetch_relations(&owner, "owner").unwrap().is_empty());
}

#[test]
fn test_disallowed_relation_target_is_rejected() {
    let ctx = TestContext::new();
    let elements = MemoryElementStore::new();
    elements.insert(Element::document(3, "/home", "page"));
    let page = FieldValue::from(elements.resolve(ElementRef::document(3)));

    let mapper = ctx.mapper();
    let mut product = filled_product(&ctx, 5);
    mapper.set_value(&mut product, "owner", page).unwrap();

    let err = mapper.validate(&mut product, false).unwrap_err();
    assert_eq!(
        err.to_string(),
        "validation error: Invalid data in field `owner` [type: manyToOneRelation]"
    );
}

#[test]
fn test_dangling_relation_is_cleared_on_next_save() {
    let ctx = TestContext::new();
    let owner = OwnerKey::object("Product", 6);
    ctx.store
        .write_relations(&owner, "owner", &[RelationRow::new("owner", ElementRef::object(42))])
        .unwrap();

    let mapper = ctx.mapper();
    let mut product = ObjectContainer::new("Product", 6);
    mapper.load(&mut product).unwrap();
    mapper.set_value(&mut product, "title", FieldValue::text("Lamp")).unwrap();

    assert_eq!(mapper.get_value(&mut product, "owner").unwrap(), FieldValue::Null);
    assert!(product.is_field_dirty("owner"));

    mapper.save(&mut product, false).unwrap();
    assert!(!product.is_dirty());
    assert!(ctx.store.fetch_relations(&owner, "owner").unwrap().is_empty());
}

#[test]
fn test_unpublished_targets_are_hidden_per_request() {
    let ctx = TestContext::new();
    let mapper = ctx.mapper();
    let mut product = filled_product(&ctx, 7);
    mapper
        .set_value(&mut product, "owner", ctx.element(ElementRef::object(6)))
        .unwrap();
    mapper.save(&mut product, false).unwrap();

    let hidden = ctx
        .mapper()
        .with_request(RequestContext::new().with_hide_unpublished(true));
    let mut loaded = ObjectContainer::new("Product", 7);
    hidden.load(&mut loaded).unwrap();
    assert_eq!(hidden.get_value(&mut loaded, "owner").unwrap(), FieldValue::Null);

    let mut loaded = ObjectContainer::new("Product", 7);
    mapper.load(&mut loaded).unwrap();
    let owner = mapper.get_value(&mut loaded, "owner").unwrap();
    assert_eq!(owner.as_element().map(Element::id), Some(6));
}

#[test]
fn test_brick_relations_carry_owner_type() {
    let ctx = TestContext::new();
    let mapper = ctx.mapper();
    let mut brick = ObjectContainer::brick("Product", 8, "dimensions");
    mapper.set_value(&mut brick, "title", FieldValue::text("Desk")).unwrap();
    mapper
        .set_value(&mut brick, "owner", ctx.element(ElementRef::object(5)))
        .unwrap();
    mapper.save(&mut brick, false).unwrap();

    let owner = OwnerKey::for_container(&brick);
    let rows = ctx.store.fetch_relations(&owner, "owner").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].owner_type, OwnerType::Objectbrick);
    assert!(ctx
        .store
        .fetch_relations(&OwnerKey::object("Product", 8), "owner")
        .unwrap()
        .is_empty());
}

#[test]
fn test_localized_container_loads_relations_eagerly() {
    let ctx = TestContext::new();
    let mapper = ctx.mapper();
    let mut localized = ObjectContainer::localized("Product", 9, "en");
    mapper.set_value(&mut localized, "title", FieldValue::text("Chair")).unwrap();
    mapper
        .set_value(&mut localized, "owner", ctx.element(ElementRef::asset(17)))
        .unwrap();
    mapper.save(&mut localized, false).unwrap();

    let mut loaded = ObjectContainer::localized("Product", 9, "en");
    mapper.load(&mut loaded).unwrap();
    assert!(loaded.is_lazy_key_loaded("owner"));
    let fetches = ctx.store.relation_fetches();

    let owner = mapper.get_value(&mut loaded, "owner").unwrap();
    assert_eq!(owner.as_element().map(Element::id), Some(17));
    assert_eq!(ctx.store.relation_fetches(), fetches);
}

#[test]
fn test_dependencies_and_id_rewrite() {
    let ctx = TestContext::new();
    let mapper = ctx.mapper();
    let mut product = filled_product(&ctx, 10);
    mapper.save(&mut product, false).unwrap();

    let mut loaded = ObjectContainer::new("Product", 10);
    mapper.load(&mut loaded).unwrap();
    let deps = mapper.dependencies(&mut loaded).unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps["asset_17"].id, 17);
    assert_eq!(deps["asset_17"].kind, ElementKind::Asset);

    let mapping = IdMapping::new().with(ElementKind::Asset, 17, 170);
    mapper.rewrite_ids(&mut loaded, &mapping).unwrap();
    let owner = mapper.get_value(&mut loaded, "owner").unwrap();
    assert_eq!(owner.as_element().map(Element::path), Some("/images/chair-copy.jpg"));

    let untouched = IdMapping::new().with(ElementKind::Object, 170, 1);
    mapper.rewrite_ids(&mut loaded, &untouched).unwrap();
    let owner = mapper.get_value(&mut loaded, "owner").unwrap();
    assert_eq!(owner.as_element().map(Element::id), Some(170));
}

#[test]
fn test_csv_and_search_index() {
    let ctx = TestContext::new();
    let mapper = ctx.mapper();
    let mut product = filled_product(&ctx, 11);

    let cells = mapper.export_csv(&mut product).unwrap();
    let lookup = |name: &str| {
        cells
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, cell)| cell.clone())
    };
    assert_eq!(lookup("title").as_deref(), Some("Chair"));
    assert_eq!(lookup("colors").as_deref(), Some("red,blue"));
    assert_eq!(lookup("owner").as_deref(), Some("asset:/images/chair.jpg"));

    let index = mapper.search_index(&mut product).unwrap();
    assert!(index.contains("Chair"));
    assert!(index.contains("red blue"));
}

#[test]
fn test_filter_conditions() {
    let ctx = TestContext::new();
    let mapper = ctx.mapper();
    let builder = ConditionBuilder::new(&EngineConfig::default());

    let cond = mapper
        .filter_condition(&FilterRequest::eq("colors", "red"), &builder)
        .unwrap();
    assert_eq!(cond.to_inline_sql(), "`colors` LIKE '%,red,%'");

    let cond = mapper
        .filter_condition(&FilterRequest::eq("owner", "asset|17"), &builder)
        .unwrap();
    assert_eq!(cond.to_inline_sql(), "(`owner__type` = 'asset' AND `owner__id` = 17)");

    let cond = mapper
        .filter_condition(
            &FilterRequest::eq("owner", "object|5").with_brick_prefix("`dimensions`."),
            &builder,
        )
        .unwrap();
    assert_eq!(
        cond.to_inline_sql(),
        "(`dimensions`.`owner__type` = 'object' AND `dimensions`.`owner__id` = 5)"
    );

    let err = mapper
        .filter_condition(&FilterRequest::new("colors", Operator::Like, "re"), &builder)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "filtering multiselect in class Product does not support the \"LIKE\" operator"
    );

    assert!(matches!(
        mapper.filter_condition(&FilterRequest::eq("missing", "x"), &builder),
        Err(Error::UnknownField(_))
    ));
}

#[test]
fn test_definition_save_rejects_delimiter_in_options() {
    let providers = OptionsProviderRegistry::new();
    assert!(product_class().save_definition(&providers).is_ok());

    let class = ClassDefinition::new("Product").with_field(
        Multiselect::new("sizes").with_options(vec![SelectOption::new("Small, medium", "s,m")]),
    );
    match class.save_definition(&providers).unwrap_err() {
        Error::Validation(e) => {
            assert_eq!(e.field, "sizes");
            assert_eq!(e.fieldtype, "multiselect");
            assert_eq!(
                e.message,
                "Field sizes: Multiselect option values may not contain commas (,)"
            );
        }
        other => panic!("unexpected error {:?}", other),
    }

    let providers = OptionsProviderRegistry::new().with_provider(
        "SizeProvider",
        Arc::new(StaticOptionsProvider::new(vec![SelectOption::new("XL", "x,l")])),
    );
    let class = ClassDefinition::new("Product")
        .with_field(Multiselect::new("sizes").with_options_provider_class("SizeProvider"));
    assert!(matches!(
        class.save_definition(&providers),
        Err(Error::Validation(_))
    ));
}

#[test]
fn test_definition_json_roundtrip() {
    let class = product_class();
    let json = class.to_json(&RequestContext::new()).unwrap();
    let parsed = ClassDefinition::from_json(&json).unwrap();
    assert_eq!(parsed, class);

    let colors = parsed.field("colors").unwrap().field_type();
    assert_eq!(colors.fieldtype(), "multiselect");
    assert!(colors.is_filterable());
}
