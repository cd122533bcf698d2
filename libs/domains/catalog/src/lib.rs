//! Catalog domain: categories, subcategories and products.
//!
//! The three entities form a strict tree. A product always points at one
//! subcategory and at the category that subcategory belongs to, and the
//! services keep that pair consistent on every write.
//!
//! ```text
//! handlers     /categories, /subcategories, /products
//!    │
//! service      parent checks, cascades, delete guards, stock
//!    │
//! repository   traits + MongoDB implementations
//! ```
//!
//! Deactivating a parent deactivates its descendants. Deleting a parent is
//! refused while it still has children. Both rules live in [`service`], backed
//! by the predicates in [`rules`].

pub mod error;
pub mod handlers;
pub mod models;
pub mod mongodb;
pub mod repository;
pub mod rules;
pub mod service;

pub use error::{CatalogError, CatalogResult};
pub use models::{Category, Product, Subcategory};
pub use mongodb::{MongoCategoryRepository, MongoProductRepository, MongoSubcategoryRepository};
pub use repository::{CategoryRepository, ProductRepository, SubcategoryRepository};
pub use service::{CatalogStore, CategoryService, ProductService, SubcategoryService};
