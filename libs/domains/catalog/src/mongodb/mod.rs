//! MongoDB implementations of the catalog repositories

mod category;
mod product;
mod subcategory;

pub use category::{COLLECTION as CATEGORIES, MongoCategoryRepository};
pub use product::{COLLECTION as PRODUCTS, MongoProductRepository};
pub use subcategory::{COLLECTION as SUBCATEGORIES, MongoSubcategoryRepository};

use chrono::{SecondsFormat, Utc};
use futures_util::TryStreamExt;
use mongodb::{
    Collection,
    bson::{Bson, Document, doc},
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::CatalogResult;
use crate::models::ReorderItem;
use crate::repository::ActivityCounts;
use crate::rules::{contains_pattern, exact_name_pattern};

fn id_filter(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

fn id_strings(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}

fn ids_filter(ids: &[Uuid]) -> Document {
    doc! { "_id": { "$in": id_strings(ids) } }
}

/// Same textual form chrono's serde impl produces for stored timestamps
fn now() -> Bson {
    Bson::String(Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// `{ name: /^name$/i }`, optionally excluding one document
fn name_filter(name: &str, exclude: Option<Uuid>) -> Document {
    let mut filter = doc! {
        "name": { "$regex": exact_name_pattern(name), "$options": "i" }
    };
    if let Some(id) = exclude {
        filter.insert("_id", doc! { "$ne": id.to_string() });
    }
    filter
}

/// `$or` of case-insensitive substring matches; `None` for blank input
fn search_clause(search: Option<&str>, fields: &[&str]) -> Option<Bson> {
    let search = search.map(str::trim).filter(|s| !s.is_empty())?;
    let pattern = contains_pattern(search);

    let clauses = fields
        .iter()
        .map(|field| {
            let mut clause = Document::new();
            clause.insert(*field, doc! { "$regex": pattern.as_str(), "$options": "i" });
            Bson::Document(clause)
        })
        .collect();
    Some(Bson::Array(clauses))
}

/// Cascade update: sets `isActive=false` on every active child of `parent`
async fn deactivate_children<T: Send + Sync>(
    collection: &Collection<T>,
    parent_field: &str,
    parent: Uuid,
    actor: Uuid,
) -> CatalogResult<u64> {
    let mut filter = doc! { "isActive": true };
    filter.insert(parent_field, parent.to_string());

    let update = doc! {
        "$set": {
            "isActive": false,
            "updatedBy": actor.to_string(),
            "updatedAt": now(),
        }
    };

    let result = collection.update_many(filter, update).await?;
    Ok(result.modified_count)
}

/// Number of documents per value of `field`, restricted to `parents`
async fn count_grouped<T: Send + Sync>(
    collection: &Collection<T>,
    field: &str,
    parents: &[Uuid],
) -> CatalogResult<HashMap<Uuid, u64>> {
    if parents.is_empty() {
        return Ok(HashMap::new());
    }

    let mut matcher = Document::new();
    matcher.insert(field, doc! { "$in": id_strings(parents) });

    let pipeline = vec![
        doc! { "$match": matcher },
        doc! { "$group": { "_id": format!("${field}"), "count": { "$sum": 1 } } },
    ];

    let mut cursor = collection.aggregate(pipeline).await?;
    let mut counts = HashMap::with_capacity(parents.len());
    while let Some(row) = cursor.try_next().await? {
        let Some(parent) = row.get_str("_id").ok().and_then(|id| Uuid::parse_str(id).ok()) else {
            continue;
        };
        counts.insert(parent, bson_count(row.get("count")));
    }

    Ok(counts)
}

fn bson_count(value: Option<&Bson>) -> u64 {
    match value {
        Some(Bson::Int32(n)) => u64::try_from(*n).unwrap_or_default(),
        Some(Bson::Int64(n)) => u64::try_from(*n).unwrap_or_default(),
        Some(Bson::Double(n)) if *n > 0.0 => *n as u64,
        _ => 0,
    }
}

async fn count_by_field<T: Send + Sync>(collection: &Collection<T>, field: &str, parent: Uuid) -> CatalogResult<u64> {
    let mut filter = Document::new();
    filter.insert(field, parent.to_string());
    Ok(collection.count_documents(filter).await?)
}

async fn set_sort_orders<T: Send + Sync>(
    collection: &Collection<T>,
    items: &[ReorderItem],
    actor: Uuid,
) -> CatalogResult<()> {
    for item in items {
        let update = doc! {
            "$set": {
                "sortOrder": item.sort_order,
                "updatedBy": actor.to_string(),
                "updatedAt": now(),
            }
        };
        collection.update_one(id_filter(item.id), update).await?;
    }
    Ok(())
}

async fn activity_counts<T: Send + Sync>(collection: &Collection<T>) -> CatalogResult<ActivityCounts> {
    let total = collection.count_documents(doc! {}).await?;
    let active = collection.count_documents(doc! { "isActive": true }).await?;
    Ok(ActivityCounts { total, active })
}

async fn count_existing<T: Send + Sync>(collection: &Collection<T>, ids: &[Uuid]) -> CatalogResult<u64> {
    Ok(collection.count_documents(ids_filter(ids)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_filter_is_anchored_and_escaped() {
        let exclude = Uuid::now_v7();
        let filter = name_filter(" Audio (Pro) ", Some(exclude));

        let name = filter.get_document("name").unwrap();
        assert_eq!(name.get_str("$regex").unwrap(), r"^Audio \(Pro\)$");
        assert_eq!(name.get_str("$options").unwrap(), "i");
        assert_eq!(
            filter.get_document("_id").unwrap().get_str("$ne").unwrap(),
            exclude.to_string()
        );
    }

    #[test]
    fn test_search_clause() {
        assert!(search_clause(None, &["name"]).is_none());
        assert!(search_clause(Some("  "), &["name"]).is_none());

        let Some(Bson::Array(clauses)) = search_clause(Some("a.b"), &["name", "sku"]) else {
            panic!("expected $or clauses");
        };
        assert_eq!(clauses.len(), 2);
        let sku = clauses[1].as_document().unwrap().get_document("sku").unwrap();
        assert_eq!(sku.get_str("$regex").unwrap(), r"a\.b");
    }

    #[test]
    fn test_bson_count() {
        assert_eq!(bson_count(Some(&Bson::Int32(3))), 3);
        assert_eq!(bson_count(Some(&Bson::Int64(7))), 7);
        assert_eq!(bson_count(Some(&Bson::Int32(-1))), 0);
        assert_eq!(bson_count(None), 0);
    }
}
