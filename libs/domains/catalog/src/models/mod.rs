mod category;
mod common;
mod product;
mod subcategory;

pub use category::{Category, CategoryDetail, CategoryFilter, CategoryStats, CategoryWithCounts, CreateCategory, UpdateCategory};
pub use common::{ParentSummary, ReorderItem, ReorderRequest};
pub use product::{
    CreateProduct, Dimensions, Product, ProductFilter, ProductImage, ProductResponse, ProductStats, ProductTotals,
    Stock, StockOperation, StockUpdate, StockUpdateResult, UpdateProduct, normalize_sku,
};
pub use subcategory::{
    CreateSubcategory, Subcategory, SubcategoryDetail, SubcategoryFilter, SubcategoryStats, SubcategoryWithCounts,
    UpdateSubcategory,
};
