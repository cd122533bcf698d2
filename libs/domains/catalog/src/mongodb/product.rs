use async_trait::async_trait;
use axum_helpers::PageQuery;
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{self, Document, doc},
    options::{FindOptions, IndexOptions},
};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

use super::{
    count_by_field, count_existing, count_grouped, deactivate_children, id_filter, now, search_clause,
    set_sort_orders,
};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{Product, ProductFilter, ProductTotals, ReorderItem};
use crate::repository::ProductRepository;

pub const COLLECTION: &str = "products";

const SEARCH_FIELDS: [&str; 4] = ["name", "description", "sku", "tags"];

#[derive(Clone)]
pub struct MongoProductRepository {
    collection: Collection<Product>,
}

impl MongoProductRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Product>(COLLECTION),
        }
    }

    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<Product>(collection_name),
        }
    }

    pub async fn init_indexes(&self) -> CatalogResult<()> {
        let single = |field: &str, name: &str| {
            let mut keys = Document::new();
            keys.insert(field, 1);
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(name.to_string()).build())
                .build()
        };

        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "sku": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("idx_sku_unique".to_string())
                        .build(),
                )
                .build(),
            single("category", "idx_category"),
            single("subcategory", "idx_subcategory"),
            single("isActive", "idx_is_active"),
            single("isFeatured", "idx_is_featured"),
            single("stock.quantity", "idx_stock_quantity"),
            single("sortOrder", "idx_sort_order"),
            single("tags", "idx_tags"),
            IndexModel::builder()
                .keys(doc! {
                    "name": "text",
                    "description": "text",
                    "shortDescription": "text",
                    "tags": "text",
                })
                .options(IndexOptions::builder().name("idx_text_search".to_string()).build())
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Product indexes created successfully");
        Ok(())
    }

    pub fn collection(&self) -> &Collection<Product> {
        &self.collection
    }

    fn build_filter(filter: &ProductFilter) -> Document {
        let mut doc = doc! {};

        if let Some(category) = filter.category {
            doc.insert("category", category.to_string());
        }
        if let Some(subcategory) = filter.subcategory {
            doc.insert("subcategory", subcategory.to_string());
        }
        if let Some(is_active) = filter.is_active {
            doc.insert("isActive", is_active);
        }
        if let Some(is_featured) = filter.is_featured {
            doc.insert("isFeatured", is_featured);
        }
        if let Some(is_digital) = filter.is_digital {
            doc.insert("isDigital", is_digital);
        }

        if filter.min_price.is_some() || filter.max_price.is_some() {
            let mut price = Document::new();
            if let Some(min) = filter.min_price {
                price.insert("$gte", min);
            }
            if let Some(max) = filter.max_price {
                price.insert("$lte", max);
            }
            doc.insert("price", price);
        }

        if filter.low_stock == Some(true) {
            doc.insert("$expr", low_stock_expr());
        }

        if let Some(clauses) = search_clause(filter.search.as_deref(), &SEARCH_FIELDS) {
            doc.insert("$or", clauses);
        }

        doc
    }
}

fn low_stock_expr() -> Document {
    doc! {
        "$and": [
            { "$eq": ["$stock.trackStock", true] },
            { "$lte": ["$stock.quantity", "$stock.minStock"] },
        ]
    }
}

fn default_sort() -> Document {
    doc! { "sortOrder": 1, "name": 1 }
}

#[async_trait]
impl ProductRepository for MongoProductRepository {
    #[instrument(skip(self, product), fields(sku = %product.sku))]
    async fn create(&self, product: Product) -> CatalogResult<Product> {
        self.collection.insert_one(&product).await?;

        tracing::info!(product_id = %product.id, sku = %product.sku, "Product created successfully");
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> CatalogResult<Option<Product>> {
        Ok(self.collection.find_one(id_filter(id)).await?)
    }

    #[instrument(skip(self))]
    async fn find_by_sku(&self, sku: &str) -> CatalogResult<Option<Product>> {
        Ok(self.collection.find_one(doc! { "sku": sku }).await?)
    }

    #[instrument(skip(self))]
    async fn find_by_slug(&self, slug: &str) -> CatalogResult<Option<Product>> {
        Ok(self.collection.find_one(doc! { "slug": slug }).await?)
    }

    #[instrument(skip(self))]
    async fn sku_taken(&self, sku: &str, exclude: Option<Uuid>) -> CatalogResult<bool> {
        let mut filter = doc! { "sku": sku };
        if let Some(id) = exclude {
            filter.insert("_id", doc! { "$ne": id.to_string() });
        }

        let count = self.collection.count_documents(filter).await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &ProductFilter, page: PageQuery) -> CatalogResult<(Vec<Product>, u64)> {
        let mongo_filter = Self::build_filter(filter);

        let options = FindOptions::builder()
            .sort(default_sort())
            .skip(page.skip())
            .limit(page.limit as i64)
            .build();

        let cursor = self
            .collection
            .find(mongo_filter.clone())
            .with_options(options)
            .await?;
        let products: Vec<Product> = cursor.try_collect().await?;
        let total = self.collection.count_documents(mongo_filter).await?;

        Ok((products, total))
    }

    #[instrument(skip(self))]
    async fn list_matching(&self, filter: &ProductFilter) -> CatalogResult<Vec<Product>> {
        let cursor = self
            .collection
            .find(Self::build_filter(filter))
            .sort(default_sort())
            .await?;
        Ok(cursor.try_collect().await?)
    }

    #[instrument(skip(self, categories), fields(count = categories.len()))]
    async fn count_by_categories(&self, categories: &[Uuid]) -> CatalogResult<HashMap<Uuid, u64>> {
        count_grouped(&self.collection, "category", categories).await
    }

    #[instrument(skip(self, subcategories), fields(count = subcategories.len()))]
    async fn count_by_subcategories(&self, subcategories: &[Uuid]) -> CatalogResult<HashMap<Uuid, u64>> {
        count_grouped(&self.collection, "subcategory", subcategories).await
    }

    #[instrument(skip(self))]
    async fn count_by_category(&self, category: Uuid) -> CatalogResult<u64> {
        count_by_field(&self.collection, "category", category).await
    }

    #[instrument(skip(self))]
    async fn count_by_subcategory(&self, subcategory: Uuid) -> CatalogResult<u64> {
        count_by_field(&self.collection, "subcategory", subcategory).await
    }

    #[instrument(skip(self))]
    async fn deactivate_by_category(&self, category: Uuid, actor: Uuid) -> CatalogResult<u64> {
        let modified = deactivate_children(&self.collection, "category", category, actor).await?;

        tracing::info!(category_id = %category, modified, "Products deactivated");
        Ok(modified)
    }

    #[instrument(skip(self))]
    async fn deactivate_by_subcategory(&self, subcategory: Uuid, actor: Uuid) -> CatalogResult<u64> {
        let modified = deactivate_children(&self.collection, "subcategory", subcategory, actor).await?;

        tracing::info!(subcategory_id = %subcategory, modified, "Products deactivated");
        Ok(modified)
    }

    #[instrument(skip(self))]
    async fn move_to_category(&self, subcategory: Uuid, category: Uuid, actor: Uuid) -> CatalogResult<u64> {
        let update = doc! {
            "$set": {
                "category": category.to_string(),
                "updatedBy": actor.to_string(),
                "updatedAt": now(),
            }
        };
        let result = self
            .collection
            .update_many(doc! { "subcategory": subcategory.to_string() }, update)
            .await?;

        tracing::info!(
            subcategory_id = %subcategory,
            category_id = %category,
            modified = result.modified_count,
            "Products moved"
        );
        Ok(result.modified_count)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id))]
    async fn update(&self, product: Product) -> CatalogResult<Product> {
        let result = self
            .collection
            .replace_one(id_filter(product.id), &product)
            .await?;

        if result.matched_count == 0 {
            return Err(CatalogError::NotFound("Product"));
        }

        tracing::info!(product_id = %product.id, "Product updated successfully");
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
        let result = self.collection.delete_one(id_filter(id)).await?;

        if result.deleted_count > 0 {
            tracing::info!(product_id = %id, "Product deleted successfully");
        }
        Ok(result.deleted_count > 0)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn count_existing(&self, ids: &[Uuid]) -> CatalogResult<u64> {
        count_existing(&self.collection, ids).await
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn set_sort_orders(&self, items: &[ReorderItem], actor: Uuid) -> CatalogResult<()> {
        set_sort_orders(&self.collection, items, actor).await
    }

    #[instrument(skip(self))]
    async fn totals(&self) -> CatalogResult<ProductTotals> {
        let pipeline = vec![doc! {
            "$group": {
                "_id": null,
                "totalProducts": { "$sum": 1 },
                "activeProducts": { "$sum": { "$cond": [{ "$eq": ["$isActive", true] }, 1, 0] } },
                "featuredProducts": { "$sum": { "$cond": [{ "$eq": ["$isFeatured", true] }, 1, 0] } },
                "digitalProducts": { "$sum": { "$cond": [{ "$eq": ["$isDigital", true] }, 1, 0] } },
                "totalValue": { "$sum": { "$multiply": ["$price", "$stock.quantity"] } },
                "averagePrice": { "$avg": "$price" },
            }
        }];

        let mut cursor = self.collection.aggregate(pipeline).await?;
        match cursor.try_next().await? {
            Some(row) => bson::from_document(row)
                .map_err(|e| CatalogError::Internal(format!("Malformed product totals: {e}"))),
            None => Ok(ProductTotals::default()),
        }
    }

    #[instrument(skip(self))]
    async fn low_stock(&self, limit: i64) -> CatalogResult<Vec<Product>> {
        let cursor = self
            .collection
            .find(doc! { "$expr": low_stock_expr() })
            .sort(doc! { "stock.quantity": 1 })
            .limit(limit)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    #[instrument(skip(self))]
    async fn top_priced(&self, limit: i64) -> CatalogResult<Vec<Product>> {
        let cursor = self
            .collection
            .find(doc! { "isActive": true })
            .sort(doc! { "price": -1 })
            .limit(limit)
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
