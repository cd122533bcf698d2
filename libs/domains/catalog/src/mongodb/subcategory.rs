use async_trait::async_trait;
use axum_helpers::PageQuery;
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Document, doc},
    options::{FindOptions, IndexOptions},
};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

use super::{
    activity_counts, count_by_field, count_existing, count_grouped, deactivate_children, id_filter, ids_filter,
    name_filter, search_clause, set_sort_orders,
};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{ReorderItem, Subcategory, SubcategoryFilter};
use crate::repository::{ActivityCounts, SubcategoryRepository};

pub const COLLECTION: &str = "subcategories";

#[derive(Clone)]
pub struct MongoSubcategoryRepository {
    collection: Collection<Subcategory>,
}

impl MongoSubcategoryRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Subcategory>(COLLECTION),
        }
    }

    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<Subcategory>(collection_name),
        }
    }

    pub async fn init_indexes(&self) -> CatalogResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "category": 1, "slug": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("idx_category_slug_unique".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "category": 1 })
                .options(IndexOptions::builder().name("idx_category".to_string()).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "isActive": 1 })
                .options(IndexOptions::builder().name("idx_is_active".to_string()).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "sortOrder": 1 })
                .options(IndexOptions::builder().name("idx_sort_order".to_string()).build())
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Subcategory indexes created successfully");
        Ok(())
    }

    pub fn collection(&self) -> &Collection<Subcategory> {
        &self.collection
    }

    fn build_filter(filter: &SubcategoryFilter) -> Document {
        let mut doc = doc! {};

        if let Some(category) = filter.category {
            doc.insert("category", category.to_string());
        }

        if let Some(is_active) = filter.is_active {
            doc.insert("isActive", is_active);
        }

        if let Some(clauses) = search_clause(filter.search.as_deref(), &["name", "description"]) {
            doc.insert("$or", clauses);
        }

        doc
    }

    async fn find_sorted(&self, filter: Document) -> CatalogResult<Vec<Subcategory>> {
        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "sortOrder": 1, "name": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

#[async_trait]
impl SubcategoryRepository for MongoSubcategoryRepository {
    #[instrument(skip(self, subcategory), fields(name = %subcategory.name))]
    async fn create(&self, subcategory: Subcategory) -> CatalogResult<Subcategory> {
        self.collection.insert_one(&subcategory).await?;

        tracing::info!(subcategory_id = %subcategory.id, category_id = %subcategory.category, "Subcategory created successfully");
        Ok(subcategory)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> CatalogResult<Option<Subcategory>> {
        Ok(self.collection.find_one(id_filter(id)).await?)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_by_ids(&self, ids: &[Uuid]) -> CatalogResult<Vec<Subcategory>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self.collection.find(ids_filter(ids)).await?;
        Ok(cursor.try_collect().await?)
    }

    #[instrument(skip(self))]
    async fn find_by_slug(&self, slug: &str) -> CatalogResult<Option<Subcategory>> {
        Ok(self.collection.find_one(doc! { "slug": slug }).await?)
    }

    #[instrument(skip(self))]
    async fn name_taken(&self, name: &str, category: Uuid, exclude: Option<Uuid>) -> CatalogResult<bool> {
        let mut filter = name_filter(name, exclude);
        filter.insert("category", category.to_string());

        let count = self.collection.count_documents(filter).await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &SubcategoryFilter, page: PageQuery) -> CatalogResult<(Vec<Subcategory>, u64)> {
        let mongo_filter = Self::build_filter(filter);

        let options = FindOptions::builder()
            .sort(doc! { "sortOrder": 1, "name": 1 })
            .skip(page.skip())
            .limit(page.limit as i64)
            .build();

        let cursor = self
            .collection
            .find(mongo_filter.clone())
            .with_options(options)
            .await?;
        let subcategories: Vec<Subcategory> = cursor.try_collect().await?;
        let total = self.collection.count_documents(mongo_filter).await?;

        Ok((subcategories, total))
    }

    #[instrument(skip(self))]
    async fn list_all(&self, active_only: bool) -> CatalogResult<Vec<Subcategory>> {
        let filter = if active_only {
            doc! { "isActive": true }
        } else {
            doc! {}
        };
        self.find_sorted(filter).await
    }

    #[instrument(skip(self))]
    async fn list_by_category(&self, category: Uuid, active_only: bool) -> CatalogResult<Vec<Subcategory>> {
        let mut filter = doc! { "category": category.to_string() };
        if active_only {
            filter.insert("isActive", true);
        }
        self.find_sorted(filter).await
    }

    #[instrument(skip(self, categories), fields(count = categories.len()))]
    async fn count_by_categories(&self, categories: &[Uuid]) -> CatalogResult<HashMap<Uuid, u64>> {
        count_grouped(&self.collection, "category", categories).await
    }

    #[instrument(skip(self))]
    async fn count_by_category(&self, category: Uuid) -> CatalogResult<u64> {
        count_by_field(&self.collection, "category", category).await
    }

    #[instrument(skip(self))]
    async fn deactivate_by_category(&self, category: Uuid, actor: Uuid) -> CatalogResult<u64> {
        let modified = deactivate_children(&self.collection, "category", category, actor).await?;

        tracing::info!(category_id = %category, modified, "Subcategories deactivated");
        Ok(modified)
    }

    #[instrument(skip(self, subcategory), fields(subcategory_id = %subcategory.id))]
    async fn update(&self, subcategory: Subcategory) -> CatalogResult<Subcategory> {
        let result = self
            .collection
            .replace_one(id_filter(subcategory.id), &subcategory)
            .await?;

        if result.matched_count == 0 {
            return Err(CatalogError::NotFound("Subcategory"));
        }

        tracing::info!(subcategory_id = %subcategory.id, "Subcategory updated successfully");
        Ok(subcategory)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
        let result = self.collection.delete_one(id_filter(id)).await?;

        if result.deleted_count > 0 {
            tracing::info!(subcategory_id = %id, "Subcategory deleted successfully");
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
    async fn counts(&self) -> CatalogResult<ActivityCounts> {
        activity_counts(&self.collection).await
    }
}
