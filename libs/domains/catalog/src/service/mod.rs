//! Catalog business logic.
//!
//! Services load documents through the repositories, run the hierarchy rules,
//! then write. Deactivating a parent cascades to its children here, not in
//! the database.

mod category;
mod product;
mod subcategory;

pub use category::CategoryService;
pub use product::ProductService;
pub use subcategory::SubcategoryService;

use domain_users::AuthUser;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{ParentSummary, Product, ProductResponse, ReorderItem};
use crate::repository::{CategoryRepository, ProductRepository, SubcategoryRepository};

/// The three catalog repositories, shared by every catalog service
#[derive(Clone)]
pub struct CatalogStore {
    pub categories: Arc<dyn CategoryRepository>,
    pub subcategories: Arc<dyn SubcategoryRepository>,
    pub products: Arc<dyn ProductRepository>,
}

impl CatalogStore {
    pub fn new(
        categories: impl CategoryRepository + 'static,
        subcategories: impl SubcategoryRepository + 'static,
        products: impl ProductRepository + 'static,
    ) -> Self {
        Self {
            categories: Arc::new(categories),
            subcategories: Arc::new(subcategories),
            products: Arc::new(products),
        }
    }

    /// Decorates products with their derived fields and parent summaries.
    pub(crate) async fn product_responses(&self, products: Vec<Product>) -> CatalogResult<Vec<ProductResponse>> {
        let category_ids = distinct(products.iter().map(|p| p.category));
        let subcategory_ids = distinct(products.iter().map(|p| p.subcategory));

        let categories: HashMap<Uuid, ParentSummary> = self
            .categories
            .find_by_ids(&category_ids)
            .await?
            .iter()
            .map(|c| (c.id, ParentSummary::from(c)))
            .collect();
        let subcategories: HashMap<Uuid, ParentSummary> = self
            .subcategories
            .find_by_ids(&subcategory_ids)
            .await?
            .iter()
            .map(|s| (s.id, ParentSummary::from(s)))
            .collect();

        Ok(products
            .into_iter()
            .map(|product| {
                let category = categories.get(&product.category).cloned();
                let subcategory = subcategories.get(&product.subcategory).cloned();
                ProductResponse::from(product).with_parents(category, subcategory)
            })
            .collect())
    }

    pub(crate) async fn product_response(&self, product: Product) -> CatalogResult<ProductResponse> {
        let mut responses = self.product_responses(vec![product]).await?;
        responses
            .pop()
            .ok_or_else(|| CatalogError::Internal("Product vanished while decorating".to_string()))
    }
}

fn require_admin(actor: &AuthUser) -> CatalogResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(CatalogError::Forbidden("Admin access required".to_string()))
    }
}

/// Unique ids, first-seen order
fn distinct(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

/// Ids of a reorder request; duplicates collapse so the existence count lines up.
fn reorder_ids(items: &[ReorderItem]) -> Vec<Uuid> {
    distinct(items.iter().map(|item| item.id))
}

fn ensure_slug(slug: &str) -> CatalogResult<()> {
    if slug.is_empty() {
        Err(CatalogError::Validation(
            "Name must contain at least one letter or digit".to_string(),
        ))
    } else {
        Ok(())
    }
}
