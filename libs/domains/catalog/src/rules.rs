//! Consistency rules of the Category → Subcategory → Product hierarchy.
//!
//! Pure predicates; services load the documents and call these before writing.

use thiserror::Error;
use uuid::Uuid;

use crate::models::{Category, Subcategory};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    #[error("{entity} {id} does not exist")]
    ParentNotFound { entity: &'static str, id: Uuid },

    #[error("{entity} '{name}' is inactive")]
    ParentInactive { entity: &'static str, name: String },

    #[error("Subcategory does not belong to the selected category")]
    SubcategoryMismatch,

    #[error("Cannot delete {entity}: it still has {dependents}")]
    HasDependents {
        entity: &'static str,
        dependents: String,
    },

    #[error("A {entity} named '{name}' already exists{scope}")]
    DuplicateName {
        entity: &'static str,
        name: String,
        scope: &'static str,
    },
}

/// URL-safe identifier derived from a display name.
///
/// ```
/// use domain_catalog::rules::slugify;
///
/// assert_eq!(slugify("Electrónica & Hogar"), "electronica-hogar");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars().flat_map(char::to_lowercase).map(fold_accent) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Anchored, escaped pattern for a case-insensitive exact-name match
pub fn exact_name_pattern(name: &str) -> String {
    format!("^{}$", regex::escape(name.trim()))
}

/// Escaped pattern for a case-insensitive substring match on user input
pub fn contains_pattern(search: &str) -> String {
    regex::escape(search.trim())
}

pub fn ensure_category_usable(category: Option<&Category>, id: Uuid) -> Result<&Category, RuleViolation> {
    let category = category.ok_or(RuleViolation::ParentNotFound {
        entity: "Category",
        id,
    })?;

    if !category.is_active {
        return Err(RuleViolation::ParentInactive {
            entity: "Category",
            name: category.name.clone(),
        });
    }

    Ok(category)
}

pub fn ensure_subcategory_usable(
    subcategory: Option<&Subcategory>,
    id: Uuid,
) -> Result<&Subcategory, RuleViolation> {
    let subcategory = subcategory.ok_or(RuleViolation::ParentNotFound {
        entity: "Subcategory",
        id,
    })?;

    if !subcategory.is_active {
        return Err(RuleViolation::ParentInactive {
            entity: "Subcategory",
            name: subcategory.name.clone(),
        });
    }

    Ok(subcategory)
}

pub fn ensure_subcategory_in_category(
    subcategory: &Subcategory,
    category_id: Uuid,
) -> Result<(), RuleViolation> {
    if subcategory.category == category_id {
        Ok(())
    } else {
        Err(RuleViolation::SubcategoryMismatch)
    }
}

/// Delete guard: refuses while any labelled dependent count is non-zero.
pub fn ensure_no_children(entity: &'static str, children: &[(&str, u64)]) -> Result<(), RuleViolation> {
    let remaining: Vec<String> = children
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(label, count)| format!("{count} {label}"))
        .collect();

    if remaining.is_empty() {
        Ok(())
    } else {
        Err(RuleViolation::HasDependents {
            entity,
            dependents: remaining.join(" and "),
        })
    }
}

pub fn ensure_unique_name(
    entity: &'static str,
    name: &str,
    taken: bool,
    scope: &'static str,
) -> Result<(), RuleViolation> {
    if taken {
        Err(RuleViolation::DuplicateName {
            entity,
            name: name.trim().to_string(),
            scope,
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn category(is_active: bool) -> Category {
        let now = Utc::now();
        Category {
            id: Uuid::now_v7(),
            name: "Electrónica".into(),
            description: "Gadgets".into(),
            slug: "electronica".into(),
            is_active,
            icon: None,
            color: None,
            sort_order: 0,
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn subcategory(parent: Uuid, is_active: bool) -> Subcategory {
        let now = Utc::now();
        Subcategory {
            id: Uuid::now_v7(),
            name: "Móviles".into(),
            description: None,
            category: parent,
            slug: "moviles".into(),
            is_active,
            icon: None,
            color: None,
            sort_order: 0,
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Electrónica & Hogar"), "electronica-hogar");
        assert_eq!(slugify("  Niños / Juguetes  "), "ninos-juguetes");
        assert_eq!(slugify("PINGÜINOS 2024!!"), "pinguinos-2024");
        assert_eq!(slugify("--a--b--"), "a-b");
        assert_eq!(slugify("¡¿!?"), "");
    }

    #[test]
    fn test_exact_name_pattern_is_escaped() {
        assert_eq!(exact_name_pattern(" A+B (x) "), r"^A\+B \(x\)$");
        assert_eq!(contains_pattern("50%.off"), r"50%\.off");
    }

    #[test]
    fn test_category_usable() {
        let id = Uuid::now_v7();
        assert_eq!(
            ensure_category_usable(None, id).unwrap_err(),
            RuleViolation::ParentNotFound {
                entity: "Category",
                id
            }
        );

        let inactive = category(false);
        assert!(matches!(
            ensure_category_usable(Some(&inactive), inactive.id),
            Err(RuleViolation::ParentInactive { .. })
        ));

        let active = category(true);
        assert!(ensure_category_usable(Some(&active), active.id).is_ok());
    }

    #[test]
    fn test_subcategory_usable_and_membership() {
        let parent = category(true);
        let other = Uuid::now_v7();

        let inactive = subcategory(parent.id, false);
        assert!(matches!(
            ensure_subcategory_usable(Some(&inactive), inactive.id),
            Err(RuleViolation::ParentInactive { entity: "Subcategory", .. })
        ));

        let active = subcategory(parent.id, true);
        assert!(ensure_subcategory_usable(Some(&active), active.id).is_ok());
        assert!(ensure_subcategory_in_category(&active, parent.id).is_ok());
        assert_eq!(
            ensure_subcategory_in_category(&active, other),
            Err(RuleViolation::SubcategoryMismatch)
        );
    }

    #[test]
    fn test_delete_guard() {
        assert!(ensure_no_children("category", &[("subcategories", 0), ("products", 0)]).is_ok());

        let err = ensure_no_children("category", &[("subcategories", 2), ("products", 5)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot delete category: it still has 2 subcategories and 5 products"
        );

        let err = ensure_no_children("subcategory", &[("products", 1)]).unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete subcategory: it still has 1 products");
    }

    #[test]
    fn test_duplicate_name_message() {
        let err = ensure_unique_name("subcategory", " Móviles ", true, " in this category").unwrap_err();
        assert_eq!(
            err.to_string(),
            "A subcategory named 'Móviles' already exists in this category"
        );
        assert!(ensure_unique_name("category", "x", false, "").is_ok());
    }
}
