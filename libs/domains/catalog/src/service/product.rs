use axum_helpers::{PageQuery, Pagination};
use chrono::Utc;
use domain_users::AuthUser;
use tracing::instrument;
use uuid::Uuid;

use super::{CatalogStore, ensure_slug, reorder_ids, require_admin};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    CreateProduct, Product, ProductFilter, ProductResponse, ProductStats, ReorderItem, StockUpdate,
    StockUpdateResult, UpdateProduct, normalize_sku,
};
use crate::rules::{ensure_category_usable, ensure_subcategory_in_category, ensure_subcategory_usable};

const LOW_STOCK_LIMIT: i64 = 10;
const TOP_PRICED_LIMIT: i64 = 5;

/// Service layer for Product business logic
#[derive(Clone)]
pub struct ProductService {
    store: CatalogStore,
}

impl ProductService {
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }

    async fn load(&self, id: Uuid) -> CatalogResult<Product> {
        self.store
            .products
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound("Product"))
    }

    /// Both parents exist and are active, and the subcategory sits under the category.
    async fn check_parents(&self, category: Uuid, subcategory: Uuid) -> CatalogResult<()> {
        let parent = self.store.categories.find_by_id(category).await?;
        ensure_category_usable(parent.as_ref(), category)?;

        let child = self.store.subcategories.find_by_id(subcategory).await?;
        let child = ensure_subcategory_usable(child.as_ref(), subcategory)?;
        ensure_subcategory_in_category(child, category)?;

        Ok(())
    }

    async fn matching(&self, filter: ProductFilter) -> CatalogResult<Vec<ProductResponse>> {
        let products = self.store.products.list_matching(&filter).await?;
        self.store.product_responses(products).await
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: ProductFilter) -> CatalogResult<(Vec<ProductResponse>, Pagination)> {
        let page = PageQuery::new(filter.page, filter.limit);
        let (products, total) = self.store.products.list(&filter, page).await?;

        Ok((
            self.store.product_responses(products).await?,
            Pagination::new(page, total),
        ))
    }

    pub async fn active(&self) -> CatalogResult<Vec<ProductResponse>> {
        self.matching(ProductFilter {
            is_active: Some(true),
            ..Default::default()
        })
        .await
    }

    pub async fn featured(&self) -> CatalogResult<Vec<ProductResponse>> {
        self.matching(ProductFilter {
            is_active: Some(true),
            is_featured: Some(true),
            ..Default::default()
        })
        .await
    }

    /// Active products of an existing category
    #[instrument(skip(self))]
    pub async fn by_category(&self, category: Uuid) -> CatalogResult<Vec<ProductResponse>> {
        if self.store.categories.find_by_id(category).await?.is_none() {
            return Err(CatalogError::NotFound("Category"));
        }
        self.matching(ProductFilter {
            category: Some(category),
            is_active: Some(true),
            ..Default::default()
        })
        .await
    }

    /// Active products of an existing subcategory
    #[instrument(skip(self))]
    pub async fn by_subcategory(&self, subcategory: Uuid) -> CatalogResult<Vec<ProductResponse>> {
        if self.store.subcategories.find_by_id(subcategory).await?.is_none() {
            return Err(CatalogError::NotFound("Subcategory"));
        }
        self.matching(ProductFilter {
            subcategory: Some(subcategory),
            is_active: Some(true),
            ..Default::default()
        })
        .await
    }

    pub async fn get(&self, id: Uuid) -> CatalogResult<ProductResponse> {
        let product = self.load(id).await?;
        self.store.product_response(product).await
    }

    /// Lookup is case-insensitive: SKUs are stored upper-cased.
    pub async fn get_by_sku(&self, sku: &str) -> CatalogResult<ProductResponse> {
        let product = self
            .store
            .products
            .find_by_sku(&normalize_sku(sku))
            .await?
            .ok_or(CatalogError::NotFound("Product"))?;
        self.store.product_response(product).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> CatalogResult<ProductResponse> {
        let product = self
            .store
            .products
            .find_by_slug(slug)
            .await?
            .ok_or(CatalogError::NotFound("Product"))?;
        self.store.product_response(product).await
    }

    #[instrument(skip(self, actor, input), fields(actor = %actor.id, sku = %input.sku))]
    pub async fn create(&self, actor: &AuthUser, input: CreateProduct) -> CatalogResult<ProductResponse> {
        let (Some(category), Some(subcategory)) = (input.category, input.subcategory) else {
            return Err(CatalogError::Validation(
                "Category and subcategory are required".to_string(),
            ));
        };
        self.check_parents(category, subcategory).await?;

        let sku = normalize_sku(&input.sku);
        if self.store.products.sku_taken(&sku, None).await? {
            return Err(CatalogError::DuplicateSku(sku));
        }

        let product = Product::new(input, category, subcategory, actor.id);
        ensure_slug(&product.slug)?;

        let created = self.store.products.create(product).await?;
        self.store.product_response(created).await
    }

    /// Re-validates the effective parent pair whenever either side changes or the product is activated.
    #[instrument(skip(self, actor, input), fields(actor = %actor.id))]
    pub async fn update(&self, actor: &AuthUser, id: Uuid, input: UpdateProduct) -> CatalogResult<ProductResponse> {
        let mut product = self.load(id).await?;

        if let Some(sku) = input.sku.as_deref().map(normalize_sku) {
            if sku != product.sku && self.store.products.sku_taken(&sku, Some(id)).await? {
                return Err(CatalogError::DuplicateSku(sku));
            }
        }

        let activating = input.is_active == Some(true) && !product.is_active;
        if input.moves_parent() || activating {
            let category = input.category.unwrap_or(product.category);
            let subcategory = input.subcategory.unwrap_or(product.subcategory);
            self.check_parents(category, subcategory).await?;
        }

        product.apply_update(input, actor.id);
        ensure_slug(&product.slug)?;
        product
            .check_compare_price()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        let updated = self.store.products.update(product).await?;
        self.store.product_response(updated).await
    }

    /// Activation needs both parents active.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn toggle_status(&self, actor: &AuthUser, id: Uuid) -> CatalogResult<ProductResponse> {
        let mut product = self.load(id).await?;

        if !product.is_active {
            let category = self.store.categories.find_by_id(product.category).await?;
            ensure_category_usable(category.as_ref(), product.category)?;
            let subcategory = self.store.subcategories.find_by_id(product.subcategory).await?;
            ensure_subcategory_usable(subcategory.as_ref(), product.subcategory)?;
        }

        product.is_active = !product.is_active;
        product.updated_by = Some(actor.id);
        product.updated_at = Utc::now();

        let updated = self.store.products.update(product).await?;
        tracing::info!(product_id = %id, is_active = updated.is_active, "Product status toggled");
        self.store.product_response(updated).await
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn update_stock(&self, actor: &AuthUser, id: Uuid, request: StockUpdate) -> CatalogResult<StockUpdateResult> {
        let quantity = request
            .quantity
            .ok_or_else(|| CatalogError::Validation("Quantity is required".to_string()))?;
        if quantity < 0 {
            return Err(CatalogError::Validation("Quantity cannot be negative".to_string()));
        }

        let mut product = self.load(id).await?;
        if !product.stock.track_stock {
            return Err(CatalogError::Validation(
                "Product does not track stock".to_string(),
            ));
        }

        let previous_stock = product.stock.quantity;
        product.stock.quantity = request.operation.apply(previous_stock, quantity);
        product.updated_by = Some(actor.id);
        product.updated_at = Utc::now();

        let updated = self.store.products.update(product).await?;
        tracing::info!(
            product_id = %id,
            previous_stock,
            new_stock = updated.stock.quantity,
            "Stock updated"
        );

        Ok(StockUpdateResult {
            sku: updated.sku.clone(),
            name: updated.name.clone(),
            previous_stock,
            new_stock: updated.stock.quantity,
            is_low_stock: updated.stock.is_low(),
            is_out_of_stock: updated.stock.is_out(),
        })
    }

    #[instrument(skip(self, actor, items), fields(actor = %actor.id, count = items.len()))]
    pub async fn reorder(&self, actor: &AuthUser, items: Vec<ReorderItem>) -> CatalogResult<()> {
        let ids = reorder_ids(&items);
        if self.store.products.count_existing(&ids).await? != ids.len() as u64 {
            return Err(CatalogError::NotFound("Product"));
        }

        self.store.products.set_sort_orders(&items, actor.id).await
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> CatalogResult<ProductStats> {
        let totals = self.store.products.totals().await?;
        let low_stock = self.store.products.low_stock(LOW_STOCK_LIMIT).await?;
        let top_priced = self.store.products.top_priced(TOP_PRICED_LIMIT).await?;

        Ok(ProductStats {
            totals,
            low_stock_products: low_stock.into_iter().map(Into::into).collect(),
            top_priced_products: top_priced.into_iter().map(Into::into).collect(),
        })
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> CatalogResult<()> {
        require_admin(actor)?;

        if !self.store.products.delete(id).await? {
            return Err(CatalogError::NotFound("Product"));
        }
        Ok(())
    }
}
