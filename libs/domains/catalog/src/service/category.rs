use axum_helpers::{PageQuery, Pagination};
use chrono::Utc;
use domain_users::AuthUser;
use tracing::instrument;
use uuid::Uuid;

use super::{CatalogStore, ensure_slug, reorder_ids, require_admin};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    Category, CategoryDetail, CategoryFilter, CategoryStats, CategoryWithCounts, CreateCategory, ReorderItem,
    UpdateCategory,
};
use crate::rules::{ensure_no_children, ensure_unique_name};

/// Service layer for Category business logic
#[derive(Clone)]
pub struct CategoryService {
    store: CatalogStore,
}

impl CategoryService {
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }

    async fn load(&self, id: Uuid) -> CatalogResult<Category> {
        self.store
            .categories
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound("Category"))
    }

    async fn with_counts(&self, categories: Vec<Category>) -> CatalogResult<Vec<CategoryWithCounts>> {
        let ids: Vec<Uuid> = categories.iter().map(|c| c.id).collect();
        let subcategories = self.store.subcategories.count_by_categories(&ids).await?;
        let products = self.store.products.count_by_categories(&ids).await?;

        Ok(categories
            .into_iter()
            .map(|category| CategoryWithCounts {
                subcategories_count: subcategories.get(&category.id).copied().unwrap_or(0),
                products_count: products.get(&category.id).copied().unwrap_or(0),
                category,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: CategoryFilter) -> CatalogResult<(Vec<CategoryWithCounts>, Pagination)> {
        let page = PageQuery::new(filter.page, filter.limit);
        let (categories, total) = self.store.categories.list(&filter, page).await?;

        Ok((self.with_counts(categories).await?, Pagination::new(page, total)))
    }

    pub async fn active(&self) -> CatalogResult<Vec<Category>> {
        self.store.categories.list_all(true).await
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> CatalogResult<CategoryStats> {
        let counts = self.store.categories.counts().await?;
        let categories = self.store.categories.list_all(false).await?;

        Ok(CategoryStats {
            total_categories: counts.total,
            active_categories: counts.active,
            inactive_categories: counts.inactive(),
            categories: self.with_counts(categories).await?,
        })
    }

    pub async fn get_by_slug(&self, slug: &str) -> CatalogResult<Category> {
        self.store
            .categories
            .find_by_slug(slug)
            .await?
            .ok_or(CatalogError::NotFound("Category"))
    }

    /// Category plus its active subcategories
    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> CatalogResult<CategoryDetail> {
        let category = self.load(id).await?;
        let subcategories = self.store.subcategories.list_by_category(id, true).await?;

        Ok(CategoryDetail {
            category,
            subcategories,
        })
    }

    #[instrument(skip(self, actor, input), fields(actor = %actor.id, name = %input.name))]
    pub async fn create(&self, actor: &AuthUser, input: CreateCategory) -> CatalogResult<Category> {
        let taken = self.store.categories.name_taken(&input.name, None).await?;
        ensure_unique_name("category", &input.name, taken, "")?;

        let category = Category::new(input, actor.id);
        ensure_slug(&category.slug)?;

        self.store.categories.create(category).await
    }

    /// Deactivating an active category cascades to its subcategories and products.
    #[instrument(skip(self, actor, input), fields(actor = %actor.id))]
    pub async fn update(&self, actor: &AuthUser, id: Uuid, input: UpdateCategory) -> CatalogResult<Category> {
        let mut category = self.load(id).await?;

        let renamed = input
            .name
            .as_deref()
            .filter(|name| name.to_lowercase() != category.name.to_lowercase());
        if let Some(name) = renamed {
            let taken = self.store.categories.name_taken(name, Some(id)).await?;
            ensure_unique_name("category", name, taken, "")?;
        }

        let was_active = category.is_active;
        category.apply_update(input, actor.id);
        ensure_slug(&category.slug)?;

        let updated = self.store.categories.update(category).await?;
        if was_active && !updated.is_active {
            self.cascade_deactivation(id, actor.id).await?;
        }

        Ok(updated)
    }

    /// Activation leaves children untouched; deactivation cascades.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn toggle_status(&self, actor: &AuthUser, id: Uuid) -> CatalogResult<Category> {
        let mut category = self.load(id).await?;

        category.is_active = !category.is_active;
        category.updated_by = Some(actor.id);
        category.updated_at = Utc::now();

        let updated = self.store.categories.update(category).await?;
        if !updated.is_active {
            self.cascade_deactivation(id, actor.id).await?;
        }

        tracing::info!(category_id = %id, is_active = updated.is_active, "Category status toggled");
        Ok(updated)
    }

    async fn cascade_deactivation(&self, id: Uuid, actor: Uuid) -> CatalogResult<()> {
        let subcategories = self.store.subcategories.deactivate_by_category(id, actor).await?;
        let products = self.store.products.deactivate_by_category(id, actor).await?;

        tracing::info!(category_id = %id, subcategories, products, "Category deactivation cascaded");
        Ok(())
    }

    #[instrument(skip(self, actor, items), fields(actor = %actor.id, count = items.len()))]
    pub async fn reorder(&self, actor: &AuthUser, items: Vec<ReorderItem>) -> CatalogResult<()> {
        let ids = reorder_ids(&items);
        if self.store.categories.count_existing(&ids).await? != ids.len() as u64 {
            return Err(CatalogError::NotFound("Category"));
        }

        self.store.categories.set_sort_orders(&items, actor.id).await
    }

    /// Admin only; refused while subcategories or products still reference it.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> CatalogResult<()> {
        require_admin(actor)?;
        self.load(id).await?;

        let subcategories = self.store.subcategories.count_by_category(id).await?;
        let products = self.store.products.count_by_category(id).await?;
        ensure_no_children("category", &[("subcategories", subcategories), ("products", products)])?;

        if !self.store.categories.delete(id).await? {
            return Err(CatalogError::NotFound("Category"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{ActivityCounts, MockCategoryRepository, MockProductRepository, MockSubcategoryRepository};
    use crate::rules::RuleViolation;
    use crate::service::fixtures::{admin, category, coordinator};
    use mockall::predicate::*;
    use std::collections::HashMap;

    fn service(
        categories: MockCategoryRepository,
        subcategories: MockSubcategoryRepository,
        products: MockProductRepository,
    ) -> CategoryService {
        CategoryService::new(CatalogStore::new(categories, subcategories, products))
    }

    fn create_input(name: &str) -> CreateCategory {
        CreateCategory {
            name: name.into(),
            description: "desc".into(),
            icon: None,
            color: None,
            sort_order: None,
            is_active: None,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() {
        let mut categories = MockCategoryRepository::new();
        categories
            .expect_name_taken()
            .withf(|name, exclude| name.to_string() == "Hogar" && exclude.is_none())
            .returning(|_, _| Ok(true));
        categories.expect_create().never();

        let service = service(categories, MockSubcategoryRepository::new(), MockProductRepository::new());
        let err = service.create(&coordinator(), create_input("Hogar")).await.unwrap_err();

        assert!(matches!(err, CatalogError::Rule(RuleViolation::DuplicateName { .. })));
    }

    #[tokio::test]
    async fn test_create_derives_slug_and_author() {
        let mut categories = MockCategoryRepository::new();
        categories.expect_name_taken().returning(|_, _| Ok(false));
        categories.expect_create().returning(Ok);

        let actor = coordinator();
        let service = service(categories, MockSubcategoryRepository::new(), MockProductRepository::new());
        let created = service.create(&actor, create_input("Electrónica")).await.unwrap();

        assert_eq!(created.slug, "electronica");
        assert_eq!(created.created_by, Some(actor.id));
    }

    #[tokio::test]
    async fn test_create_rejects_symbol_only_name() {
        let mut categories = MockCategoryRepository::new();
        categories.expect_name_taken().returning(|_, _| Ok(false));
        categories.expect_create().never();

        let service = service(categories, MockSubcategoryRepository::new(), MockProductRepository::new());
        let err = service.create(&admin(), create_input("!!")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[tokio::test]
    async fn test_deactivating_update_cascades() {
        let existing = category("Hogar", true);
        let id = existing.id;

        let mut categories = MockCategoryRepository::new();
        categories
            .expect_find_by_id()
            .with(eq(id))
            .returning(move |_| Ok(Some(existing.clone())));
        categories.expect_update().returning(Ok);

        let mut subcategories = MockSubcategoryRepository::new();
        subcategories
            .expect_deactivate_by_category()
            .with(eq(id), always())
            .times(1)
            .returning(|_, _| Ok(3));
        let mut products = MockProductRepository::new();
        products
            .expect_deactivate_by_category()
            .with(eq(id), always())
            .times(1)
            .returning(|_, _| Ok(12));

        let service = service(categories, subcategories, products);
        let update = UpdateCategory {
            is_active: Some(false),
            ..Default::default()
        };
        let updated = service.update(&coordinator(), id, update).await.unwrap();
        assert!(!updated.is_active);
    }

    #[tokio::test]
    async fn test_rename_checks_other_categories() {
        let existing = category("Hogar", true);
        let id = existing.id;

        let mut categories = MockCategoryRepository::new();
        categories
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        categories
            .expect_name_taken()
            .withf(move |name, exclude| name.to_string() == "Jardín" && *exclude == Some(id))
            .returning(|_, _| Ok(true));
        categories.expect_update().never();

        let service = service(categories, MockSubcategoryRepository::new(), MockProductRepository::new());
        let update = UpdateCategory {
            name: Some("Jardín".into()),
            ..Default::default()
        };
        let err = service.update(&coordinator(), id, update).await.unwrap_err();
        assert!(matches!(err, CatalogError::Rule(RuleViolation::DuplicateName { .. })));
    }

    #[tokio::test]
    async fn test_case_only_rename_skips_name_lookup() {
        let existing = category("Électronique", true);
        let id = existing.id;

        let mut categories = MockCategoryRepository::new();
        categories
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        categories.expect_name_taken().never();
        categories.expect_update().returning(Ok);

        let service = service(categories, MockSubcategoryRepository::new(), MockProductRepository::new());
        let update = UpdateCategory {
            name: Some("ÉLECTRONIQUE".into()),
            ..Default::default()
        };
        let updated = service.update(&coordinator(), id, update).await.unwrap();
        assert_eq!(updated.slug, "electronique");
    }

    #[tokio::test]
    async fn test_toggle_activation_does_not_touch_children() {
        let existing = category("Hogar", false);
        let id = existing.id;

        let mut categories = MockCategoryRepository::new();
        categories
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        categories.expect_update().returning(Ok);

        let mut subcategories = MockSubcategoryRepository::new();
        subcategories.expect_deactivate_by_category().never();
        let mut products = MockProductRepository::new();
        products.expect_deactivate_by_category().never();

        let service = service(categories, subcategories, products);
        let toggled = service.toggle_status(&coordinator(), id).await.unwrap();
        assert!(toggled.is_active);
    }

    #[tokio::test]
    async fn test_delete_requires_admin() {
        let service = service(
            MockCategoryRepository::new(),
            MockSubcategoryRepository::new(),
            MockProductRepository::new(),
        );
        let err = service.delete(&coordinator(), Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, CatalogError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_delete_guard_counts_children() {
        let existing = category("Hogar", true);
        let id = existing.id;

        let mut categories = MockCategoryRepository::new();
        categories
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        categories.expect_delete().never();
        let mut subcategories = MockSubcategoryRepository::new();
        subcategories.expect_count_by_category().returning(|_| Ok(2));
        let mut products = MockProductRepository::new();
        products.expect_count_by_category().returning(|_| Ok(0));

        let service = service(categories, subcategories, products);
        let err = service.delete(&admin(), id).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete category: it still has 2 subcategories");
    }

    #[tokio::test]
    async fn test_delete_empty_category() {
        let existing = category("Hogar", true);
        let id = existing.id;

        let mut categories = MockCategoryRepository::new();
        categories
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        categories.expect_delete().with(eq(id)).times(1).returning(|_| Ok(true));
        let mut subcategories = MockSubcategoryRepository::new();
        subcategories.expect_count_by_category().returning(|_| Ok(0));
        let mut products = MockProductRepository::new();
        products.expect_count_by_category().returning(|_| Ok(0));

        let service = service(categories, subcategories, products);
        assert!(service.delete(&admin(), id).await.is_ok());
    }

    #[tokio::test]
    async fn test_reorder_requires_every_id() {
        let items = vec![
            ReorderItem {
                id: Uuid::now_v7(),
                sort_order: 1,
            },
            ReorderItem {
                id: Uuid::now_v7(),
                sort_order: 2,
            },
        ];

        let mut categories = MockCategoryRepository::new();
        categories.expect_count_existing().returning(|_| Ok(1));
        categories.expect_set_sort_orders().never();

        let service = service(categories, MockSubcategoryRepository::new(), MockProductRepository::new());
        let err = service.reorder(&coordinator(), items).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound("Category")));
    }

    #[tokio::test]
    async fn test_list_attaches_counts() {
        let first = category("Hogar", true);
        let second = category("Audio", true);
        let first_id = first.id;
        let page = vec![first, second];

        let mut categories = MockCategoryRepository::new();
        categories
            .expect_list()
            .returning(move |_, _| Ok((page.clone(), 12)));
        let mut subcategories = MockSubcategoryRepository::new();
        subcategories
            .expect_count_by_categories()
            .returning(move |_| Ok(HashMap::from([(first_id, 4)])));
        let mut products = MockProductRepository::new();
        products
            .expect_count_by_categories()
            .returning(move |_| Ok(HashMap::from([(first_id, 9)])));

        let service = service(categories, subcategories, products);
        let filter = CategoryFilter {
            page: Some(2),
            limit: Some(5),
            ..Default::default()
        };
        let (items, pagination) = service.list(filter).await.unwrap();

        assert_eq!(items[0].subcategories_count, 4);
        assert_eq!(items[0].products_count, 9);
        assert_eq!(items[1].products_count, 0);
        assert_eq!(pagination.total, 12);
        assert_eq!(pagination.pages, 3);
    }

    #[tokio::test]
    async fn test_stats() {
        let mut categories = MockCategoryRepository::new();
        categories
            .expect_counts()
            .returning(|| Ok(ActivityCounts { total: 5, active: 3 }));
        categories.expect_list_all().with(eq(false)).returning(|_| Ok(Vec::new()));
        let mut subcategories = MockSubcategoryRepository::new();
        subcategories
            .expect_count_by_categories()
            .returning(|_| Ok(HashMap::new()));
        let mut products = MockProductRepository::new();
        products.expect_count_by_categories().returning(|_| Ok(HashMap::new()));

        let service = service(categories, subcategories, products);
        let stats = service.stats().await.unwrap();
        assert_eq!(stats.inactive_categories, 2);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let mut categories = MockCategoryRepository::new();
        categories.expect_find_by_id().returning(|_| Ok(None));

        let service = service(categories, MockSubcategoryRepository::new(), MockProductRepository::new());
        let err = service.get(Uuid::now_v7()).await.unwrap_err();
        assert_eq!(err.to_string(), "Category not found");
    }
}
