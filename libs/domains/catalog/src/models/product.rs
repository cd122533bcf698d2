use axum_helpers::extractors::trim;
use chrono::{DateTime, Utc};
use database::mongodb::uuid_string;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::common::{ParentSummary, default_true};
use crate::rules::slugify;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    pub quantity: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Minimum stock cannot be negative"))]
    pub min_stock: i64,
    #[serde(default = "default_true")]
    pub track_stock: bool,
}

impl Default for Stock {
    fn default() -> Self {
        Self {
            quantity: 0,
            min_stock: 0,
            track_stock: true,
        }
    }
}

impl Stock {
    pub fn is_low(&self) -> bool {
        self.track_stock && self.quantity <= self.min_stock
    }

    pub fn is_out(&self) -> bool {
        self.track_stock && self.quantity <= 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    /// Kilograms
    #[validate(range(min = 0.0, message = "Weight cannot be negative"))]
    pub weight: Option<f64>,
    /// Centimetres
    #[validate(range(min = 0.0, message = "Length cannot be negative"))]
    pub length: Option<f64>,
    #[validate(range(min = 0.0, message = "Width cannot be negative"))]
    pub width: Option<f64>,
    #[validate(range(min = 0.0, message = "Height cannot be negative"))]
    pub height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    #[validate(length(min = 1, message = "Image url is required"))]
    pub url: String,
    #[serde(default)]
    #[validate(length(max = 200, message = "Alt text cannot exceed 200 characters"))]
    pub alt: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

/// Sellable item; belongs to one subcategory of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", alias = "id", with = "uuid_string")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "uuid_string")]
    pub category: Uuid,
    #[serde(with = "uuid_string")]
    pub subcategory: Uuid,
    pub slug: String,
    /// Upper-cased on write
    pub sku: String,
    pub price: f64,
    #[serde(default)]
    pub compare_price: Option<f64>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub stock: Stock,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    /// Lower-cased and trimmed on write
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_digital: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub seo_description: Option<String>,
    #[serde(default, with = "uuid_string::option")]
    pub created_by: Option<Uuid>,
    #[serde(default, with = "uuid_string::option")]
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn normalize_sku(sku: &str) -> String {
    sku.trim().to_uppercase()
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

impl Product {
    /// `category` and `subcategory` are the already-checked parent ids.
    pub fn new(input: CreateProduct, category: Uuid, subcategory: Uuid, actor: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            slug: slugify(&input.name),
            name: input.name,
            short_description: input.short_description,
            description: input.description,
            category,
            subcategory,
            sku: normalize_sku(&input.sku),
            price: input.price,
            compare_price: input.compare_price,
            cost: input.cost,
            stock: input.stock.unwrap_or_default(),
            dimensions: input.dimensions,
            images: input.images.unwrap_or_default(),
            tags: normalize_tags(input.tags.unwrap_or_default()),
            is_active: input.is_active.unwrap_or(true),
            is_featured: input.is_featured.unwrap_or(false),
            is_digital: input.is_digital.unwrap_or(false),
            sort_order: input.sort_order.unwrap_or(0),
            seo_title: input.seo_title,
            seo_description: input.seo_description,
            created_by: Some(actor),
            updated_by: Some(actor),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateProduct, actor: Uuid) {
        if let Some(name) = update.name {
            self.slug = slugify(&name);
            self.name = name;
        }
        if update.short_description.is_some() {
            self.short_description = update.short_description;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(subcategory) = update.subcategory {
            self.subcategory = subcategory;
        }
        if let Some(sku) = update.sku {
            self.sku = normalize_sku(&sku);
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if update.compare_price.is_some() {
            self.compare_price = update.compare_price;
        }
        if update.cost.is_some() {
            self.cost = update.cost;
        }
        if let Some(stock) = update.stock {
            self.stock = stock;
        }
        if update.dimensions.is_some() {
            self.dimensions = update.dimensions;
        }
        if let Some(images) = update.images {
            self.images = images;
        }
        if let Some(tags) = update.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(is_featured) = update.is_featured {
            self.is_featured = is_featured;
        }
        if let Some(is_digital) = update.is_digital {
            self.is_digital = is_digital;
        }
        if let Some(sort_order) = update.sort_order {
            self.sort_order = sort_order;
        }
        if update.seo_title.is_some() {
            self.seo_title = update.seo_title;
        }
        if update.seo_description.is_some() {
            self.seo_description = update.seo_description;
        }
        self.updated_by = Some(actor);
        self.updated_at = Utc::now();
    }

    /// `(price - cost) / price * 100`, or 0 without a cost
    pub fn profit_margin(&self) -> f64 {
        match self.cost {
            Some(cost) if self.price > 0.0 => (self.price - cost) / self.price * 100.0,
            _ => 0.0,
        }
    }

    /// First image flagged primary, else the first image
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images
            .iter()
            .find(|image| image.is_primary)
            .or_else(|| self.images.first())
    }

    /// `compare_price` may not undercut `price`
    pub fn check_compare_price(&self) -> Result<(), ValidationError> {
        check_compare_price(self.price, self.compare_price)
    }
}

fn check_compare_price(price: f64, compare_price: Option<f64>) -> Result<(), ValidationError> {
    match compare_price {
        Some(compare) if compare < price => Err(ValidationError::new("compare_price")
            .with_message("Compare price must be greater than or equal to the price".into())),
        _ => Ok(()),
    }
}

fn validate_create_prices(input: &CreateProduct) -> Result<(), ValidationError> {
    check_compare_price(input.price, input.compare_price)
}

fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.iter().any(|tag| tag.trim().chars().count() > 50) {
        return Err(ValidationError::new("tags").with_message("Each tag cannot exceed 50 characters".into()));
    }
    Ok(())
}

fn validate_sku(sku: &str) -> Result<(), ValidationError> {
    let len = sku.trim().chars().count();
    if (3..=50).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::new("sku").with_message("SKU must be between 3 and 50 characters".into()))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_create_prices"))]
pub struct CreateProduct {
    #[serde(deserialize_with = "trim::string")]
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(max = 250, message = "Short description cannot exceed 250 characters"))]
    pub short_description: Option<String>,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
    #[serde(default, alias = "categoryId")]
    #[validate(required(message = "Category is required"))]
    pub category: Option<Uuid>,
    #[serde(default, alias = "subcategoryId")]
    #[validate(required(message = "Subcategory is required"))]
    pub subcategory: Option<Uuid>,
    #[validate(custom(function = "validate_sku"))]
    pub sku: String,
    #[validate(range(exclusive_min = 0.0, message = "Price must be greater than 0"))]
    pub price: f64,
    #[validate(range(min = 0.0, message = "Compare price cannot be negative"))]
    pub compare_price: Option<f64>,
    #[validate(range(min = 0.0, message = "Cost cannot be negative"))]
    pub cost: Option<f64>,
    #[validate(nested)]
    pub stock: Option<Stock>,
    #[validate(nested)]
    pub dimensions: Option<Dimensions>,
    #[validate(nested)]
    pub images: Option<Vec<ProductImage>>,
    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub is_digital: Option<bool>,
    pub sort_order: Option<i32>,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(max = 70, message = "SEO title cannot exceed 70 characters"))]
    pub seo_title: Option<String>,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(max = 160, message = "SEO description cannot exceed 160 characters"))]
    pub seo_description: Option<String>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(max = 250, message = "Short description cannot exceed 250 characters"))]
    pub short_description: Option<String>,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
    #[serde(default, alias = "categoryId")]
    pub category: Option<Uuid>,
    #[serde(default, alias = "subcategoryId")]
    pub subcategory: Option<Uuid>,
    #[validate(custom(function = "validate_sku"))]
    pub sku: Option<String>,
    #[validate(range(exclusive_min = 0.0, message = "Price must be greater than 0"))]
    pub price: Option<f64>,
    #[validate(range(min = 0.0, message = "Compare price cannot be negative"))]
    pub compare_price: Option<f64>,
    #[validate(range(min = 0.0, message = "Cost cannot be negative"))]
    pub cost: Option<f64>,
    #[validate(nested)]
    pub stock: Option<Stock>,
    #[validate(nested)]
    pub dimensions: Option<Dimensions>,
    #[validate(nested)]
    pub images: Option<Vec<ProductImage>>,
    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub is_digital: Option<bool>,
    pub sort_order: Option<i32>,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(max = 70, message = "SEO title cannot exceed 70 characters"))]
    pub seo_title: Option<String>,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(max = 160, message = "SEO description cannot exceed 160 characters"))]
    pub seo_description: Option<String>,
}

impl UpdateProduct {
    pub fn moves_parent(&self) -> bool {
        self.category.is_some() || self.subcategory.is_some()
    }
}

/// Query string of `GET /products`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    #[serde(alias = "categoryId")]
    pub category: Option<Uuid>,
    #[serde(alias = "subcategoryId")]
    pub subcategory: Option<Uuid>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub is_digital: Option<bool>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Only tracked products at or below their minimum stock
    pub low_stock: Option<bool>,
    /// Case-insensitive match on name, description, SKU and tags
    pub search: Option<String>,
}

/// Product with its derived fields and, in lists, parent summaries
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    #[serde(flatten)]
    pub product: Product,
    pub profit_margin: f64,
    pub is_low_stock: bool,
    pub is_out_of_stock: bool,
    pub primary_image: Option<ProductImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_info: Option<ParentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory_info: Option<ParentSummary>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            profit_margin: product.profit_margin(),
            is_low_stock: product.stock.is_low(),
            is_out_of_stock: product.stock.is_out(),
            primary_image: product.primary_image().cloned(),
            category_info: None,
            subcategory_info: None,
            product,
        }
    }
}

impl ProductResponse {
    pub fn with_parents(
        mut self,
        category: Option<ParentSummary>,
        subcategory: Option<ParentSummary>,
    ) -> Self {
        self.category_info = category;
        self.subcategory_info = subcategory;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StockOperation {
    #[default]
    Set,
    Add,
    Subtract,
}

impl StockOperation {
    /// New quantity; subtracting never goes below zero.
    pub fn apply(self, current: i64, quantity: i64) -> i64 {
        match self {
            Self::Set => quantity,
            Self::Add => current.saturating_add(quantity),
            Self::Subtract => current.saturating_sub(quantity).max(0),
        }
    }
}

/// Body of `PATCH /products/{id}/stock`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdate {
    #[validate(
        required(message = "Quantity is required"),
        range(min = 0, message = "Quantity cannot be negative")
    )]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub operation: StockOperation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdateResult {
    pub sku: String,
    pub name: String,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub is_low_stock: bool,
    pub is_out_of_stock: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductTotals {
    pub total_products: u64,
    pub active_products: u64,
    pub featured_products: u64,
    pub digital_products: u64,
    /// Sum of `price * stock.quantity`
    pub total_value: f64,
    pub average_price: f64,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    #[serde(flatten)]
    pub totals: ProductTotals,
    /// Up to 10 tracked products at or below their minimum stock
    pub low_stock_products: Vec<ProductResponse>,
    /// The 5 most expensive active products
    pub top_priced_products: Vec<ProductResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_json(extra: &str) -> String {
        format!(
            r#"{{"name":" Teclado Mecánico ","category":"{}","subcategory":"{}","sku":" kb-01 ","price":100.0{extra}}}"#,
            Uuid::now_v7(),
            Uuid::now_v7()
        )
    }

    fn product(extra: &str) -> Product {
        let input: CreateProduct = serde_json::from_str(&create_json(extra)).unwrap();
        let category = input.category.unwrap();
        let subcategory = input.subcategory.unwrap();
        Product::new(input, category, subcategory, Uuid::now_v7())
    }

    #[test]
    fn test_new_product_normalizes_fields() {
        let product = product(r#","tags":[" Gaming ","RGB",""]"#);

        assert_eq!(product.name, "Teclado Mecánico");
        assert_eq!(product.slug, "teclado-mecanico");
        assert_eq!(product.sku, "KB-01");
        assert_eq!(product.tags, vec!["gaming", "rgb"]);
        assert!(product.stock.track_stock);
        assert!(product.is_active);
        assert!(!product.is_featured);
    }

    #[test]
    fn test_create_validation() {
        let input: CreateProduct = serde_json::from_str(&create_json(
            r#","comparePrice":50.0,"stock":{"quantity":-1},"images":[{"url":"","alt":"x"}]"#,
        ))
        .unwrap();
        let errors = input.validate().unwrap_err();
        let details = axum_helpers::errors::validation_details(&errors);

        assert!(details.get("__all__").is_some());
        assert!(details.get("stock.quantity").is_some());
        assert!(details.get("images[0].url").is_some());
    }

    #[test]
    fn test_price_must_be_positive() {
        let input: CreateProduct = serde_json::from_str(&create_json("").replace("100.0", "0")).unwrap();
        assert!(input.validate().unwrap_err().field_errors().contains_key("price"));
    }

    #[test]
    fn test_derived_fields() {
        let mut product = product(r#","cost":60.0,"stock":{"quantity":3,"minStock":5}"#);
        product.images = vec![
            ProductImage {
                url: "a.jpg".into(),
                alt: None,
                is_primary: false,
            },
            ProductImage {
                url: "b.jpg".into(),
                alt: None,
                is_primary: true,
            },
        ];

        let response = ProductResponse::from(product);
        assert!((response.profit_margin - 40.0).abs() < f64::EPSILON);
        assert!(response.is_low_stock);
        assert!(!response.is_out_of_stock);
        assert_eq!(response.primary_image.unwrap().url, "b.jpg");
    }

    #[test]
    fn test_untracked_stock_is_never_low() {
        let product = product(r#","stock":{"quantity":0,"trackStock":false}"#);
        assert!(!product.stock.is_low());
        assert!(!product.stock.is_out());
        assert_eq!(product.profit_margin(), 0.0);
        assert!(product.primary_image().is_none());
    }

    #[test]
    fn test_stock_operations() {
        assert_eq!(StockOperation::Set.apply(10, 4), 4);
        assert_eq!(StockOperation::Add.apply(10, 4), 14);
        assert_eq!(StockOperation::Subtract.apply(10, 4), 6);
        assert_eq!(StockOperation::Subtract.apply(3, 4), 0);
    }

    #[test]
    fn test_stock_update_defaults_to_set() {
        let update: StockUpdate = serde_json::from_str(r#"{"quantity":5}"#).unwrap();
        assert_eq!(update.operation, StockOperation::Set);
        assert!(update.validate().is_ok());

        let missing: StockUpdate = serde_json::from_str(r#"{"operation":"add"}"#).unwrap();
        assert!(missing.validate().is_err());
    }

    #[test]
    fn test_response_flattens_product() {
        let json = serde_json::to_value(ProductResponse::from(product(""))).unwrap();
        assert_eq!(json["sku"], "KB-01");
        assert_eq!(json["isLowStock"], true);
        assert_eq!(json["isOutOfStock"], true);
        assert!(json.get("categoryInfo").is_none());
    }
}
