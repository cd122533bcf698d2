use async_trait::async_trait;
use axum_helpers::PageQuery;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::CatalogResult;
use crate::models::{
    Category, CategoryFilter, Product, ProductFilter, ProductTotals, ReorderItem, Subcategory, SubcategoryFilter,
};

/// Active/total document counts of a collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityCounts {
    pub total: u64,
    pub active: u64,
}

impl ActivityCounts {
    pub fn inactive(&self) -> u64 {
        self.total.saturating_sub(self.active)
    }
}

/// Repository trait for Category persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: Category) -> CatalogResult<Category>;

    async fn find_by_id(&self, id: Uuid) -> CatalogResult<Option<Category>>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> CatalogResult<Vec<Category>>;

    async fn find_by_slug(&self, slug: &str) -> CatalogResult<Option<Category>>;

    /// Case-insensitive exact name match, ignoring `exclude`
    async fn name_taken(&self, name: &str, exclude: Option<Uuid>) -> CatalogResult<bool>;

    /// One page sorted by `sortOrder`, `name`, plus the total matching `filter`
    async fn list(&self, filter: &CategoryFilter, page: PageQuery) -> CatalogResult<(Vec<Category>, u64)>;

    /// Every category sorted by `sortOrder`, `name`; `active_only` restricts to active ones
    async fn list_all(&self, active_only: bool) -> CatalogResult<Vec<Category>>;

    /// Replace the stored document; `NotFound` when it vanished
    async fn update(&self, category: Category) -> CatalogResult<Category>;

    async fn delete(&self, id: Uuid) -> CatalogResult<bool>;

    /// How many of `ids` exist
    async fn count_existing(&self, ids: &[Uuid]) -> CatalogResult<u64>;

    async fn set_sort_orders(&self, items: &[ReorderItem], actor: Uuid) -> CatalogResult<()>;

    async fn counts(&self) -> CatalogResult<ActivityCounts>;
}

/// Repository trait for Subcategory persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubcategoryRepository: Send + Sync {
    async fn create(&self, subcategory: Subcategory) -> CatalogResult<Subcategory>;

    async fn find_by_id(&self, id: Uuid) -> CatalogResult<Option<Subcategory>>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> CatalogResult<Vec<Subcategory>>;

    async fn find_by_slug(&self, slug: &str) -> CatalogResult<Option<Subcategory>>;

    /// Case-insensitive exact name match inside one category, ignoring `exclude`
    async fn name_taken(&self, name: &str, category: Uuid, exclude: Option<Uuid>) -> CatalogResult<bool>;

    async fn list(&self, filter: &SubcategoryFilter, page: PageQuery) -> CatalogResult<(Vec<Subcategory>, u64)>;

    async fn list_all(&self, active_only: bool) -> CatalogResult<Vec<Subcategory>>;

    async fn list_by_category(&self, category: Uuid, active_only: bool) -> CatalogResult<Vec<Subcategory>>;

    /// Subcategory count per parent, for the given parents only
    async fn count_by_categories(&self, categories: &[Uuid]) -> CatalogResult<HashMap<Uuid, u64>>;

    async fn count_by_category(&self, category: Uuid) -> CatalogResult<u64>;

    /// Cascade: deactivates every subcategory of `category`, returns how many changed
    async fn deactivate_by_category(&self, category: Uuid, actor: Uuid) -> CatalogResult<u64>;

    async fn update(&self, subcategory: Subcategory) -> CatalogResult<Subcategory>;

    async fn delete(&self, id: Uuid) -> CatalogResult<bool>;

    async fn count_existing(&self, ids: &[Uuid]) -> CatalogResult<u64>;

    async fn set_sort_orders(&self, items: &[ReorderItem], actor: Uuid) -> CatalogResult<()>;

    async fn counts(&self) -> CatalogResult<ActivityCounts>;
}

/// Repository trait for Product persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, product: Product) -> CatalogResult<Product>;

    async fn find_by_id(&self, id: Uuid) -> CatalogResult<Option<Product>>;

    /// `sku` must already be upper-cased
    async fn find_by_sku(&self, sku: &str) -> CatalogResult<Option<Product>>;

    async fn find_by_slug(&self, slug: &str) -> CatalogResult<Option<Product>>;

    async fn sku_taken(&self, sku: &str, exclude: Option<Uuid>) -> CatalogResult<bool>;

    async fn list(&self, filter: &ProductFilter, page: PageQuery) -> CatalogResult<(Vec<Product>, u64)>;

    /// Unpaginated variant of `list`
    async fn list_matching(&self, filter: &ProductFilter) -> CatalogResult<Vec<Product>>;

    async fn count_by_categories(&self, categories: &[Uuid]) -> CatalogResult<HashMap<Uuid, u64>>;

    async fn count_by_subcategories(&self, subcategories: &[Uuid]) -> CatalogResult<HashMap<Uuid, u64>>;

    async fn count_by_category(&self, category: Uuid) -> CatalogResult<u64>;

    async fn count_by_subcategory(&self, subcategory: Uuid) -> CatalogResult<u64>;

    async fn deactivate_by_category(&self, category: Uuid, actor: Uuid) -> CatalogResult<u64>;

    async fn deactivate_by_subcategory(&self, subcategory: Uuid, actor: Uuid) -> CatalogResult<u64>;

    /// Re-points every product of `subcategory` at `category`
    async fn move_to_category(&self, subcategory: Uuid, category: Uuid, actor: Uuid) -> CatalogResult<u64>;

    async fn update(&self, product: Product) -> CatalogResult<Product>;

    async fn delete(&self, id: Uuid) -> CatalogResult<bool>;

    async fn count_existing(&self, ids: &[Uuid]) -> CatalogResult<u64>;

    async fn set_sort_orders(&self, items: &[ReorderItem], actor: Uuid) -> CatalogResult<()>;

    /// Totals aggregated over the whole collection
    async fn totals(&self) -> CatalogResult<ProductTotals>;

    /// Tracked products at or below their minimum stock
    async fn low_stock(&self, limit: i64) -> CatalogResult<Vec<Product>>;

    /// Active products, most expensive first
    async fn top_priced(&self, limit: i64) -> CatalogResult<Vec<Product>>;
}
