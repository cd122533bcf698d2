use axum_helpers::{PageQuery, Pagination};
use chrono::Utc;
use domain_users::AuthUser;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

use super::{CatalogStore, distinct, ensure_slug, reorder_ids, require_admin};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    CreateSubcategory, ParentSummary, ProductFilter, ReorderItem, Subcategory, SubcategoryDetail, SubcategoryFilter,
    SubcategoryStats, SubcategoryWithCounts, UpdateSubcategory,
};
use crate::rules::{ensure_category_usable, ensure_no_children, ensure_unique_name};

const NAME_SCOPE: &str = " in this category";

/// Service layer for Subcategory business logic
#[derive(Clone)]
pub struct SubcategoryService {
    store: CatalogStore,
}

impl SubcategoryService {
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }

    async fn load(&self, id: Uuid) -> CatalogResult<Subcategory> {
        self.store
            .subcategories
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound("Subcategory"))
    }

    /// The parent must exist and be active to receive a subcategory.
    async fn usable_parent(&self, category: Uuid) -> CatalogResult<()> {
        let parent = self.store.categories.find_by_id(category).await?;
        ensure_category_usable(parent.as_ref(), category)?;
        Ok(())
    }

    async fn with_counts(&self, subcategories: Vec<Subcategory>) -> CatalogResult<Vec<SubcategoryWithCounts>> {
        let ids: Vec<Uuid> = subcategories.iter().map(|s| s.id).collect();
        let parent_ids = distinct(subcategories.iter().map(|s| s.category));

        let parents: HashMap<Uuid, ParentSummary> = self
            .store
            .categories
            .find_by_ids(&parent_ids)
            .await?
            .iter()
            .map(|c| (c.id, ParentSummary::from(c)))
            .collect();
        let products = self.store.products.count_by_subcategories(&ids).await?;

        Ok(subcategories
            .into_iter()
            .map(|subcategory| SubcategoryWithCounts {
                category_info: parents.get(&subcategory.category).cloned(),
                products_count: products.get(&subcategory.id).copied().unwrap_or(0),
                subcategory,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: SubcategoryFilter) -> CatalogResult<(Vec<SubcategoryWithCounts>, Pagination)> {
        let page = PageQuery::new(filter.page, filter.limit);
        let (subcategories, total) = self.store.subcategories.list(&filter, page).await?;

        Ok((self.with_counts(subcategories).await?, Pagination::new(page, total)))
    }

    pub async fn active(&self) -> CatalogResult<Vec<Subcategory>> {
        self.store.subcategories.list_all(true).await
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> CatalogResult<SubcategoryStats> {
        let counts = self.store.subcategories.counts().await?;
        let subcategories = self.store.subcategories.list_all(false).await?;

        Ok(SubcategoryStats {
            total_subcategories: counts.total,
            active_subcategories: counts.active,
            inactive_subcategories: counts.inactive(),
            subcategories: self.with_counts(subcategories).await?,
        })
    }

    /// Every subcategory of an existing category
    #[instrument(skip(self))]
    pub async fn by_category(&self, category: Uuid) -> CatalogResult<Vec<Subcategory>> {
        if self.store.categories.find_by_id(category).await?.is_none() {
            return Err(CatalogError::NotFound("Category"));
        }
        self.store.subcategories.list_by_category(category, false).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> CatalogResult<Subcategory> {
        self.store
            .subcategories
            .find_by_slug(slug)
            .await?
            .ok_or(CatalogError::NotFound("Subcategory"))
    }

    /// Subcategory with its parent summary and active products
    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> CatalogResult<SubcategoryDetail> {
        let subcategory = self.load(id).await?;
        let category_info = self
            .store
            .categories
            .find_by_id(subcategory.category)
            .await?
            .as_ref()
            .map(ParentSummary::from);

        let filter = ProductFilter {
            subcategory: Some(id),
            is_active: Some(true),
            ..Default::default()
        };
        let products = self.store.products.list_matching(&filter).await?;

        Ok(SubcategoryDetail {
            subcategory,
            category_info,
            products: products.into_iter().map(Into::into).collect(),
        })
    }

    #[instrument(skip(self, actor, input), fields(actor = %actor.id, name = %input.name))]
    pub async fn create(&self, actor: &AuthUser, input: CreateSubcategory) -> CatalogResult<Subcategory> {
        let category = input
            .category
            .ok_or_else(|| CatalogError::Validation("Category is required".to_string()))?;
        self.usable_parent(category).await?;

        let taken = self
            .store
            .subcategories
            .name_taken(&input.name, category, None)
            .await?;
        ensure_unique_name("subcategory", &input.name, taken, NAME_SCOPE)?;

        let subcategory = Subcategory::new(input, category, actor.id);
        ensure_slug(&subcategory.slug)?;

        self.store.subcategories.create(subcategory).await
    }

    /// Moving or activating re-checks the parent and moving carries the products along.
    /// Deactivation cascades to products.
    #[instrument(skip(self, actor, input), fields(actor = %actor.id))]
    pub async fn update(
        &self,
        actor: &AuthUser,
        id: Uuid,
        input: UpdateSubcategory,
    ) -> CatalogResult<Subcategory> {
        let mut subcategory = self.load(id).await?;

        let target = input.category.unwrap_or(subcategory.category);
        let moved = target != subcategory.category;
        let activating = input.is_active == Some(true) && !subcategory.is_active;
        if moved || activating {
            self.usable_parent(target).await?;
        }

        let renamed = input
            .name
            .as_deref()
            .is_some_and(|name| name.to_lowercase() != subcategory.name.to_lowercase());
        if renamed || moved {
            let name = input.name.as_deref().unwrap_or(&subcategory.name);
            let taken = self.store.subcategories.name_taken(name, target, Some(id)).await?;
            ensure_unique_name("subcategory", name, taken, NAME_SCOPE)?;
        }

        let was_active = subcategory.is_active;
        subcategory.apply_update(input, actor.id);
        ensure_slug(&subcategory.slug)?;

        let updated = self.store.subcategories.update(subcategory).await?;
        if moved {
            let products = self.store.products.move_to_category(id, target, actor.id).await?;
            tracing::info!(subcategory_id = %id, category_id = %target, products, "Subcategory moved");
        }
        if was_active && !updated.is_active {
            self.cascade_deactivation(id, actor.id).await?;
        }

        Ok(updated)
    }

    /// Activation needs an active parent category.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn toggle_status(&self, actor: &AuthUser, id: Uuid) -> CatalogResult<Subcategory> {
        let mut subcategory = self.load(id).await?;

        if !subcategory.is_active {
            self.usable_parent(subcategory.category).await?;
        }

        subcategory.is_active = !subcategory.is_active;
        subcategory.updated_by = Some(actor.id);
        subcategory.updated_at = Utc::now();

        let updated = self.store.subcategories.update(subcategory).await?;
        if !updated.is_active {
            self.cascade_deactivation(id, actor.id).await?;
        }

        tracing::info!(subcategory_id = %id, is_active = updated.is_active, "Subcategory status toggled");
        Ok(updated)
    }

    async fn cascade_deactivation(&self, id: Uuid, actor: Uuid) -> CatalogResult<()> {
        let products = self.store.products.deactivate_by_subcategory(id, actor).await?;

        tracing::info!(subcategory_id = %id, products, "Subcategory deactivation cascaded");
        Ok(())
    }

    #[instrument(skip(self, actor, items), fields(actor = %actor.id, count = items.len()))]
    pub async fn reorder(&self, actor: &AuthUser, items: Vec<ReorderItem>) -> CatalogResult<()> {
        let ids = reorder_ids(&items);
        if self.store.subcategories.count_existing(&ids).await? != ids.len() as u64 {
            return Err(CatalogError::NotFound("Subcategory"));
        }

        self.store.subcategories.set_sort_orders(&items, actor.id).await
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> CatalogResult<()> {
        require_admin(actor)?;
        self.load(id).await?;

        let products = self.store.products.count_by_subcategory(id).await?;
        ensure_no_children("subcategory", &[("products", products)])?;

        if !self.store.subcategories.delete(id).await? {
            return Err(CatalogError::NotFound("Subcategory"));
        }
        Ok(())
    }
}
