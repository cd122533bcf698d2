//! Integration tests for the catalog domain
//!
//! Services run against real MongoDB via testcontainers, so these cover the
//! query documents, aggregations and unique indexes the unit tests mock away.
//! Requires Docker.

use domain_catalog::models::{
    CategoryFilter, CreateCategory, CreateProduct, CreateSubcategory, ProductFilter, StockOperation, StockUpdate,
    UpdateSubcategory,
};
use domain_catalog::rules::RuleViolation;
use domain_catalog::*;
use domain_users::{AuthUser, Role};
use serde_json::json;
use test_utils::{TestDataBuilder, TestMongo, assertions::*};
use uuid::Uuid;

struct Catalog {
    categories: CategoryService,
    subcategories: SubcategoryService,
    products: ProductService,
    products_repo: MongoProductRepository,
}

async fn catalog(mongo: &TestMongo, test_name: &str) -> Catalog {
    let builder = TestDataBuilder::from_test_name(test_name);
    let db = mongo.database(&builder.database_name());

    let categories = MongoCategoryRepository::new(&db);
    let subcategories = MongoSubcategoryRepository::new(&db);
    let products = MongoProductRepository::new(&db);
    categories.init_indexes().await.unwrap();
    subcategories.init_indexes().await.unwrap();
    products.init_indexes().await.unwrap();

    let store = CatalogStore::new(categories, subcategories, products.clone());
    Catalog {
        categories: CategoryService::new(store.clone()),
        subcategories: SubcategoryService::new(store.clone()),
        products: ProductService::new(store),
        products_repo: products,
    }
}

fn admin() -> AuthUser {
    AuthUser {
        id: Uuid::now_v7(),
        username: "admin".into(),
        role: Role::Admin,
    }
}

fn new_category(name: &str) -> CreateCategory {
    serde_json::from_value(json!({ "name": name, "description": format!("{name} description") })).unwrap()
}

fn new_subcategory(name: &str, category: Uuid) -> CreateSubcategory {
    serde_json::from_value(json!({ "name": name, "category": category })).unwrap()
}

fn new_product(sku: &str, category: Uuid, subcategory: Uuid, price: f64, quantity: i64) -> CreateProduct {
    serde_json::from_value(json!({
        "name": format!("Product {sku}"),
        "category": category,
        "subcategory": subcategory,
        "sku": sku,
        "price": price,
        "stock": { "quantity": quantity, "minStock": 5 },
        "tags": ["Oferta", " hogar "],
    }))
    .unwrap()
}

#[tokio::test]
async fn test_category_names_are_case_insensitive_unique() {
    let mongo = TestMongo::new().await;
    let catalog = catalog(&mongo, "category_names").await;
    let actor = admin();

    let created = catalog
        .categories
        .create(&actor, new_category("Hogar y Jardín"))
        .await
        .unwrap();
    assert_eq!(created.slug, "hogar-y-jardin");

    let err = catalog
        .categories
        .create(&actor, new_category("hogar y jardín"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Rule(RuleViolation::DuplicateName { .. })));

    let found = catalog.categories.get_by_slug("hogar-y-jardin").await.unwrap();
    assert_uuid_eq(found.id, created.id, "slug lookup");
}

#[tokio::test]
async fn test_subcategory_names_are_scoped_to_category() {
    let mongo = TestMongo::new().await;
    let catalog = catalog(&mongo, "subcategory_scope").await;
    let actor = admin();

    let hogar = catalog.categories.create(&actor, new_category("Hogar")).await.unwrap();
    let oficina = catalog.categories.create(&actor, new_category("Oficina")).await.unwrap();

    catalog
        .subcategories
        .create(&actor, new_subcategory("Sillas", hogar.id))
        .await
        .unwrap();
    catalog
        .subcategories
        .create(&actor, new_subcategory("Sillas", oficina.id))
        .await
        .unwrap();

    let err = catalog
        .subcategories
        .create(&actor, new_subcategory("SILLAS", hogar.id))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Rule(RuleViolation::DuplicateName { .. })));

    let (listed, pagination) = catalog
        .categories
        .list(CategoryFilter {
            search: Some("hog".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(pagination.total, 1);
    assert_eq!(listed[0].subcategories_count, 1);
}

#[tokio::test]
async fn test_deactivating_category_cascades() {
    let mongo = TestMongo::new().await;
    let catalog = catalog(&mongo, "cascade").await;
    let actor = admin();

    let category = catalog.categories.create(&actor, new_category("Electrónica")).await.unwrap();
    let subcategory = catalog
        .subcategories
        .create(&actor, new_subcategory("Teclados", category.id))
        .await
        .unwrap();
    let product = catalog
        .products
        .create(&actor, new_product("kb-01", category.id, subcategory.id, 50.0, 20))
        .await
        .unwrap();

    let toggled = catalog.categories.toggle_status(&actor, category.id).await.unwrap();
    assert!(!toggled.is_active);

    let subcategory = catalog.subcategories.get(subcategory.id).await.unwrap();
    assert!(!subcategory.subcategory.is_active);
    let product = catalog.products.get(product.product.id).await.unwrap();
    assert!(!product.product.is_active);

    let err = catalog
        .products
        .toggle_status(&actor, product.product.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Rule(RuleViolation::ParentInactive { .. })));
}

#[tokio::test]
async fn test_moving_subcategory_carries_products() {
    let mongo = TestMongo::new().await;
    let catalog = catalog(&mongo, "subcategory_move").await;
    let actor = admin();

    let hogar = catalog.categories.create(&actor, new_category("Hogar")).await.unwrap();
    let oficina = catalog.categories.create(&actor, new_category("Oficina")).await.unwrap();
    let lamparas = catalog
        .subcategories
        .create(&actor, new_subcategory("Lámparas", hogar.id))
        .await
        .unwrap();
    let product = catalog
        .products
        .create(&actor, new_product("lamp-01", hogar.id, lamparas.id, 30.0, 8))
        .await
        .unwrap();

    let update = UpdateSubcategory {
        category: Some(oficina.id),
        ..Default::default()
    };
    let moved = catalog
        .subcategories
        .update(&actor, lamparas.id, update)
        .await
        .unwrap();
    assert_uuid_eq(moved.category, oficina.id, "subcategory parent");

    let product = catalog.products.get(product.product.id).await.unwrap();
    assert_uuid_eq(product.product.category, oficina.id, "product category follows");
    assert!(catalog.products.by_category(hogar.id).await.unwrap().is_empty());

    catalog.categories.delete(&actor, hogar.id).await.unwrap();
}

#[tokio::test]
async fn test_delete_guards_and_sku_uniqueness() {
    let mongo = TestMongo::new().await;
    let catalog = catalog(&mongo, "delete_guards").await;
    let actor = admin();

    let category = catalog.categories.create(&actor, new_category("Muebles")).await.unwrap();
    let subcategory = catalog
        .subcategories
        .create(&actor, new_subcategory("Sofás", category.id))
        .await
        .unwrap();
    let product = catalog
        .products
        .create(&actor, new_product("sofa-1", category.id, subcategory.id, 400.0, 3))
        .await
        .unwrap();
    assert_eq!(product.product.sku, "SOFA-1");
    assert_eq!(product.product.tags, vec!["oferta", "hogar"]);

    let err = catalog
        .products
        .create(&actor, new_product("SOFA-1", category.id, subcategory.id, 10.0, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateSku(_)));

    let err = catalog.categories.delete(&actor, category.id).await.unwrap_err();
    assert!(matches!(err, CatalogError::Rule(RuleViolation::HasDependents { .. })));

    catalog.products.delete(&actor, product.product.id).await.unwrap();
    catalog.subcategories.delete(&actor, subcategory.id).await.unwrap();
    catalog.categories.delete(&actor, category.id).await.unwrap();

    assert!(matches!(
        catalog.categories.get(category.id).await,
        Err(CatalogError::NotFound("Category"))
    ));
}

#[tokio::test]
async fn test_product_filters_stock_and_totals() {
    let mongo = TestMongo::new().await;
    let catalog = catalog(&mongo, "product_filters").await;
    let actor = admin();

    let category = catalog.categories.create(&actor, new_category("Oficina")).await.unwrap();
    let subcategory = catalog
        .subcategories
        .create(&actor, new_subcategory("Papelería", category.id))
        .await
        .unwrap();
    let cheap = catalog
        .products
        .create(&actor, new_product("pen-01", category.id, subcategory.id, 2.0, 3))
        .await
        .unwrap();
    catalog
        .products
        .create(&actor, new_product("desk-01", category.id, subcategory.id, 300.0, 10))
        .await
        .unwrap();

    let (in_range, pagination) = catalog
        .products
        .list(ProductFilter {
            min_price: Some(100.0),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(pagination.total, 1);
    assert_eq!(in_range[0].product.sku, "DESK-01");
    assert_eq!(in_range[0].category_info.as_ref().map(|c| c.id), Some(category.id));

    let low = catalog
        .products_repo
        .list_matching(&ProductFilter {
            low_stock: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(low.len(), 1);
    assert_uuid_eq(low[0].id, cheap.product.id, "low stock product");

    let (searched, _) = catalog
        .products
        .list(ProductFilter {
            search: Some("pen-".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(searched.len(), 1);

    let result = catalog
        .products
        .update_stock(
            &actor,
            cheap.product.id,
            StockUpdate {
                quantity: Some(10),
                operation: StockOperation::Subtract,
            },
        )
        .await
        .unwrap();
    assert_eq!(result.previous_stock, 3);
    assert_eq!(result.new_stock, 0);
    assert!(result.is_out_of_stock);

    let stats = catalog.products.stats().await.unwrap();
    assert_eq!(stats.totals.total_products, 2);
    assert_eq!(stats.totals.active_products, 2);
    assert_eq!(stats.totals.total_value, 3000.0);
    assert_eq!(stats.totals.average_price, 151.0);
    assert_eq!(stats.top_priced_products[0].product.sku, "DESK-01");

    let by_sku = catalog.products.get_by_sku("desk-01").await.unwrap();
    assert_some(by_sku.subcategory_info, "subcategory summary");
}
