use async_trait::async_trait;
use axum_helpers::PageQuery;
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Document, doc},
    options::{FindOptions, IndexOptions},
};
use tracing::instrument;
use uuid::Uuid;

use super::{activity_counts, count_existing, id_filter, ids_filter, name_filter, search_clause, set_sort_orders};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{Category, CategoryFilter, ReorderItem};
use crate::repository::{ActivityCounts, CategoryRepository};

pub const COLLECTION: &str = "categories";

#[derive(Clone)]
pub struct MongoCategoryRepository {
    collection: Collection<Category>,
}

impl MongoCategoryRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Category>(COLLECTION),
        }
    }

    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<Category>(collection_name),
        }
    }

    pub async fn init_indexes(&self) -> CatalogResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "slug": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("idx_slug_unique".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "isActive": 1 })
                .options(IndexOptions::builder().name("idx_is_active".to_string()).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "sortOrder": 1 })
                .options(IndexOptions::builder().name("idx_sort_order".to_string()).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "createdBy": 1 })
                .options(IndexOptions::builder().name("idx_created_by".to_string()).build())
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Category indexes created successfully");
        Ok(())
    }

    pub fn collection(&self) -> &Collection<Category> {
        &self.collection
    }

    fn build_filter(filter: &CategoryFilter) -> Document {
        let mut doc = doc! {};

        if let Some(is_active) = filter.is_active {
            doc.insert("isActive", is_active);
        }

        if let Some(clauses) = search_clause(filter.search.as_deref(), &["name", "description"]) {
            doc.insert("$or", clauses);
        }

        doc
    }

    async fn find_sorted(&self, filter: Document) -> CatalogResult<Vec<Category>> {
        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "sortOrder": 1, "name": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

#[async_trait]
impl CategoryRepository for MongoCategoryRepository {
    #[instrument(skip(self, category), fields(name = %category.name))]
    async fn create(&self, category: Category) -> CatalogResult<Category> {
        self.collection.insert_one(&category).await?;

        tracing::info!(category_id = %category.id, "Category created successfully");
        Ok(category)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> CatalogResult<Option<Category>> {
        Ok(self.collection.find_one(id_filter(id)).await?)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_by_ids(&self, ids: &[Uuid]) -> CatalogResult<Vec<Category>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self.collection.find(ids_filter(ids)).await?;
        Ok(cursor.try_collect().await?)
    }

    #[instrument(skip(self))]
    async fn find_by_slug(&self, slug: &str) -> CatalogResult<Option<Category>> {
        Ok(self.collection.find_one(doc! { "slug": slug }).await?)
    }

    #[instrument(skip(self))]
    async fn name_taken(&self, name: &str, exclude: Option<Uuid>) -> CatalogResult<bool> {
        let count = self.collection.count_documents(name_filter(name, exclude)).await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &CategoryFilter, page: PageQuery) -> CatalogResult<(Vec<Category>, u64)> {
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
        let categories: Vec<Category> = cursor.try_collect().await?;
        let total = self.collection.count_documents(mongo_filter).await?;

        Ok((categories, total))
    }

    #[instrument(skip(self))]
    async fn list_all(&self, active_only: bool) -> CatalogResult<Vec<Category>> {
        let filter = if active_only {
            doc! { "isActive": true }
        } else {
            doc! {}
        };
        self.find_sorted(filter).await
    }

    #[instrument(skip(self, category), fields(category_id = %category.id))]
    async fn update(&self, category: Category) -> CatalogResult<Category> {
        let result = self
            .collection
            .replace_one(id_filter(category.id), &category)
            .await?;

        if result.matched_count == 0 {
            return Err(CatalogError::NotFound("Category"));
        }

        tracing::info!(category_id = %category.id, "Category updated successfully");
        Ok(category)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
        let result = self.collection.delete_one(id_filter(id)).await?;

        if result.deleted_count > 0 {
            tracing::info!(category_id = %id, "Category deleted successfully");
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter() {
        let filter = CategoryFilter {
            is_active: Some(true),
            search: Some("hogar*".into()),
            ..Default::default()
        };
        let doc = MongoCategoryRepository::build_filter(&filter);

        assert!(doc.get_bool("isActive").unwrap());
        let clauses = doc.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 2);
        let pattern = clauses[0]
            .as_document()
            .unwrap()
            .get_document("name")
            .unwrap()
            .get_str("$regex")
            .unwrap();
        assert_eq!(pattern, r"hogar\*");
    }

    #[test]
    fn test_empty_filter() {
        assert!(MongoCategoryRepository::build_filter(&CategoryFilter::default()).is_empty());
    }
}
