use axum_helpers::extractors::trim;
use chrono::{DateTime, Utc};
use database::mongodb::uuid_string;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::common::{ParentSummary, default_true, validate_color};
use super::product::ProductResponse;
use crate::rules::slugify;

/// Second level of the catalog; always belongs to one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subcategory {
    #[serde(rename = "_id", alias = "id", with = "uuid_string")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Parent category id
    #[serde(with = "uuid_string")]
    pub category: Uuid,
    pub slug: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default, with = "uuid_string::option")]
    pub created_by: Option<Uuid>,
    #[serde(default, with = "uuid_string::option")]
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subcategory {
    /// `category` is the already-checked parent id.
    pub fn new(input: CreateSubcategory, category: Uuid, actor: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            slug: slugify(&input.name),
            name: input.name,
            description: input.description,
            category,
            is_active: input.is_active.unwrap_or(true),
            icon: input.icon,
            color: input.color,
            sort_order: input.sort_order.unwrap_or(0),
            created_by: Some(actor),
            updated_by: Some(actor),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateSubcategory, actor: Uuid) {
        if let Some(name) = update.name {
            self.slug = slugify(&name);
            self.name = name;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if update.icon.is_some() {
            self.icon = update.icon;
        }
        if update.color.is_some() {
            self.color = update.color;
        }
        if let Some(sort_order) = update.sort_order {
            self.sort_order = sort_order;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_by = Some(actor);
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubcategory {
    #[serde(deserialize_with = "trim::string")]
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    /// Parent category; `categoryId` is accepted too
    #[serde(default, alias = "categoryId")]
    #[validate(required(message = "Category is required"))]
    pub category: Option<Uuid>,
    #[serde(default, deserialize_with = "trim::option")]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubcategory {
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    /// Moves the subcategory to another category
    #[serde(default, alias = "categoryId")]
    pub category: Option<Uuid>,
    #[serde(default, deserialize_with = "trim::option")]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// Query string of `GET /subcategories`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SubcategoryFilter {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Parent category id; `categoryId` is accepted too
    #[serde(alias = "categoryId")]
    pub category: Option<Uuid>,
    pub is_active: Option<bool>,
    /// Case-insensitive match on name and description
    pub search: Option<String>,
}

/// Subcategory with its parent summary and product count
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubcategoryWithCounts {
    #[serde(flatten)]
    pub subcategory: Subcategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_info: Option<ParentSummary>,
    pub products_count: u64,
}

/// Subcategory plus its active products
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubcategoryDetail {
    #[serde(flatten)]
    pub subcategory: Subcategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_info: Option<ParentSummary>,
    pub products: Vec<ProductResponse>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubcategoryStats {
    pub total_subcategories: u64,
    pub active_subcategories: u64,
    pub inactive_subcategories: u64,
    pub subcategories: Vec<SubcategoryWithCounts>,
}
