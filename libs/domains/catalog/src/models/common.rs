use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{Category, Subcategory};

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").unwrap());

pub(crate) fn validate_color(color: &str) -> Result<(), ValidationError> {
    if HEX_COLOR.is_match(color) {
        Ok(())
    } else {
        Err(ValidationError::new("color").with_message("Enter a valid hex color (#RGB or #RRGGBB)".into()))
    }
}

pub(crate) fn default_true() -> bool {
    true
}

/// Compact view of a parent entity embedded in list items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParentSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
}

impl From<&Category> for ParentSummary {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
            is_active: category.is_active,
        }
    }
}

impl From<&Subcategory> for ParentSummary {
    fn from(subcategory: &Subcategory) -> Self {
        Self {
            id: subcategory.id,
            name: subcategory.name.clone(),
            slug: subcategory.slug.clone(),
            is_active: subcategory.is_active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderItem {
    pub id: Uuid,
    pub sort_order: i32,
}

/// Body of the `PUT /reorder` endpoints
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReorderRequest {
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<ReorderItem>,
}
