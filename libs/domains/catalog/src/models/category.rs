use axum_helpers::extractors::trim;
use chrono::{DateTime, Utc};
use database::mongodb::uuid_string;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::Subcategory;
use super::common::{default_true, validate_color};
use crate::rules::slugify;

/// Top level of the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id", alias = "id", with = "uuid_string")]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Derived from `name`
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

impl Category {
    pub fn new(input: CreateCategory, actor: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            slug: slugify(&input.name),
            name: input.name,
            description: input.description,
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

    /// Applies present fields; the slug follows the name.
    pub fn apply_update(&mut self, update: UpdateCategory, actor: Uuid) {
        if let Some(name) = update.name {
            self.slug = slugify(&name);
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
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
pub struct CreateCategory {
    #[serde(deserialize_with = "trim::string")]
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,
    #[serde(deserialize_with = "trim::string")]
    #[validate(length(min = 1, max = 500, message = "Description is required and cannot exceed 500 characters"))]
    pub description: String,
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
pub struct UpdateCategory {
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "trim::option")]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// Query string of `GET /categories`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CategoryFilter {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub is_active: Option<bool>,
    /// Case-insensitive match on name and description
    pub search: Option<String>,
}

/// Category plus the number of children referencing it
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithCounts {
    #[serde(flatten)]
    pub category: Category,
    pub subcategories_count: u64,
    pub products_count: u64,
}

/// Category plus its active subcategories
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub subcategories: Vec<Subcategory>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub total_categories: u64,
    pub active_categories: u64,
    pub inactive_categories: u64,
    pub categories: Vec<CategoryWithCounts>,
}
