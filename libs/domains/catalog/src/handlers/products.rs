//! HTTP handlers for the Products API

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, put},
};
use axum_helpers::{
    ApiResponse, MessageResponse, Pagination, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestIdResponse, BadRequestRuleResponse, BadRequestValidationResponse, ForbiddenResponse,
        InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
};
use domain_users::AuthUser;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::CatalogResult;
use crate::models::{
    CreateProduct, Dimensions, ParentSummary, Product, ProductFilter, ProductImage, ProductResponse, ProductStats,
    ProductTotals, ReorderItem, ReorderRequest, Stock, StockOperation, StockUpdate, StockUpdateResult,
    UpdateProduct,
};
use crate::service::ProductService;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_products,
        active_products,
        featured_products,
        product_stats,
        products_by_category,
        products_by_subcategory,
        get_product_by_sku,
        get_product_by_slug,
        get_product,
        create_product,
        update_product,
        toggle_status,
        update_stock,
        reorder_products,
        delete_product,
    ),
    components(
        schemas(
            Product,
            ProductResponse,
            ProductStats,
            ProductTotals,
            ParentSummary,
            Stock,
            Dimensions,
            ProductImage,
            CreateProduct,
            UpdateProduct,
            StockOperation,
            StockUpdate,
            StockUpdateResult,
            ReorderRequest,
            ReorderItem,
            Pagination
        ),
        responses(
            BadRequestValidationResponse,
            BadRequestIdResponse,
            BadRequestRuleResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            NotFoundResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Products", description = "Sellable items, each under one subcategory")
    )
)]
pub struct ApiDoc;

pub fn router(service: Arc<ProductService>) -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/active", get(active_products))
        .route("/featured", get(featured_products))
        .route("/stats", get(product_stats))
        .route("/reorder", put(reorder_products))
        .route("/category/{category_id}", get(products_by_category))
        .route("/subcategory/{subcategory_id}", get(products_by_subcategory))
        .route("/sku/{sku}", get(get_product_by_sku))
        .route("/slug/{slug}", get(get_product_by_slug))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/{id}/toggle-status", patch(toggle_status))
        .route("/{id}/stock", patch(update_stock))
        .with_state(service)
}

/// List products with derived fields and parent summaries
#[utoipa::path(
    get,
    path = "",
    tag = "Products",
    params(ProductFilter),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Page of products", body = ApiResponse<Vec<ProductResponse>>),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_products(
    State(service): State<Arc<ProductService>>,
    Query(filter): Query<ProductFilter>,
) -> CatalogResult<impl IntoResponse> {
    let (products, pagination) = service.list(filter).await?;
    Ok(ApiResponse::paginated(products, pagination))
}

#[utoipa::path(
    get,
    path = "/active",
    tag = "Products",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active products", body = ApiResponse<Vec<ProductResponse>>)
    )
)]
async fn active_products(State(service): State<Arc<ProductService>>) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.active().await?))
}

/// Active products flagged as featured
#[utoipa::path(
    get,
    path = "/featured",
    tag = "Products",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Featured products", body = ApiResponse<Vec<ProductResponse>>)
    )
)]
async fn featured_products(State(service): State<Arc<ProductService>>) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.featured().await?))
}

/// Inventory totals, low-stock products and the most expensive products
#[utoipa::path(
    get,
    path = "/stats",
    tag = "Products",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Product statistics", body = ApiResponse<ProductStats>)
    )
)]
async fn product_stats(State(service): State<Arc<ProductService>>) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.stats().await?))
}

#[utoipa::path(
    get,
    path = "/category/{category_id}",
    tag = "Products",
    params(("category_id" = uuid::Uuid, Path, description = "Category id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active products of the category", body = ApiResponse<Vec<ProductResponse>>),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn products_by_category(
    State(service): State<Arc<ProductService>>,
    UuidPath(category_id): UuidPath,
) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.by_category(category_id).await?))
}

#[utoipa::path(
    get,
    path = "/subcategory/{subcategory_id}",
    tag = "Products",
    params(("subcategory_id" = uuid::Uuid, Path, description = "Subcategory id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active products of the subcategory", body = ApiResponse<Vec<ProductResponse>>),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn products_by_subcategory(
    State(service): State<Arc<ProductService>>,
    UuidPath(subcategory_id): UuidPath,
) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.by_subcategory(subcategory_id).await?))
}

/// Lookup by SKU, case-insensitive
#[utoipa::path(
    get,
    path = "/sku/{sku}",
    tag = "Products",
    params(("sku" = String, Path, description = "Stock-keeping unit")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Product found", body = ApiResponse<ProductResponse>),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_product_by_sku(
    State(service): State<Arc<ProductService>>,
    Path(sku): Path<String>,
) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.get_by_sku(&sku).await?))
}

#[utoipa::path(
    get,
    path = "/slug/{slug}",
    tag = "Products",
    params(("slug" = String, Path, description = "Product slug")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Product found", body = ApiResponse<ProductResponse>),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_product_by_slug(
    State(service): State<Arc<ProductService>>,
    Path(slug): Path<String>,
) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.get_by_slug(&slug).await?))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Products",
    params(("id" = uuid::Uuid, Path, description = "Product id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Product found", body = ApiResponse<ProductResponse>),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_product(
    State(service): State<Arc<ProductService>>,
    UuidPath(id): UuidPath,
) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.get(id).await?))
}

/// Create a product under an active category/subcategory pair
#[utoipa::path(
    post,
    path = "",
    tag = "Products",
    request_body = CreateProduct,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductResponse>),
        (status = 400, response = BadRequestRuleResponse),
        (status = 401, response = UnauthorizedResponse)
    )
)]
async fn create_product(
    State(service): State<Arc<ProductService>>,
    actor: AuthUser,
    ValidatedJson(input): ValidatedJson<CreateProduct>,
) -> CatalogResult<impl IntoResponse> {
    let product = service.create(&actor, input).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Product created successfully", product),
    ))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Products",
    params(("id" = uuid::Uuid, Path, description = "Product id")),
    request_body = UpdateProduct,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductResponse>),
        (status = 400, response = BadRequestRuleResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn update_product(
    State(service): State<Arc<ProductService>>,
    actor: AuthUser,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateProduct>,
) -> CatalogResult<impl IntoResponse> {
    let product = service.update(&actor, id, input).await?;
    Ok(ApiResponse::with_message("Product updated successfully", product))
}

/// Activation requires both parents to be active
#[utoipa::path(
    patch,
    path = "/{id}/toggle-status",
    tag = "Products",
    params(("id" = uuid::Uuid, Path, description = "Product id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Status toggled", body = ApiResponse<ProductResponse>),
        (status = 400, response = BadRequestRuleResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn toggle_status(
    State(service): State<Arc<ProductService>>,
    actor: AuthUser,
    UuidPath(id): UuidPath,
) -> CatalogResult<impl IntoResponse> {
    let product = service.toggle_status(&actor, id).await?;
    let message = if product.product.is_active {
        "Product activated successfully"
    } else {
        "Product deactivated successfully"
    };
    Ok(ApiResponse::with_message(message, product))
}

/// Set, add to or subtract from the stock quantity
#[utoipa::path(
    patch,
    path = "/{id}/stock",
    tag = "Products",
    params(("id" = uuid::Uuid, Path, description = "Product id")),
    request_body = StockUpdate,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Stock updated", body = ApiResponse<StockUpdateResult>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn update_stock(
    State(service): State<Arc<ProductService>>,
    actor: AuthUser,
    UuidPath(id): UuidPath,
    ValidatedJson(request): ValidatedJson<StockUpdate>,
) -> CatalogResult<impl IntoResponse> {
    let result = service.update_stock(&actor, id, request).await?;
    Ok(ApiResponse::with_message("Stock updated successfully", result))
}

#[utoipa::path(
    put,
    path = "/reorder",
    tag = "Products",
    request_body = ReorderRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Order updated", body = MessageResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn reorder_products(
    State(service): State<Arc<ProductService>>,
    actor: AuthUser,
    ValidatedJson(request): ValidatedJson<ReorderRequest>,
) -> CatalogResult<impl IntoResponse> {
    service.reorder(&actor, request.items).await?;
    Ok(MessageResponse::new("Product order updated successfully"))
}

/// Delete a product (admin only)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Products",
    params(("id" = uuid::Uuid, Path, description = "Product id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Product deleted", body = MessageResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn delete_product(
    State(service): State<Arc<ProductService>>,
    actor: AuthUser,
    UuidPath(id): UuidPath,
) -> CatalogResult<impl IntoResponse> {
    service.delete(&actor, id).await?;
    Ok(MessageResponse::new("Product deleted successfully"))
}
