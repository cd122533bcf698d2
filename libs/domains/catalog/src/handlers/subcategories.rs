//! HTTP handlers for the Subcategories API

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
    CreateSubcategory, ParentSummary, ReorderItem, ReorderRequest, Subcategory, SubcategoryDetail,
    SubcategoryFilter, SubcategoryStats, SubcategoryWithCounts, UpdateSubcategory,
};
use crate::service::SubcategoryService;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_subcategories,
        active_subcategories,
        subcategory_stats,
        subcategories_by_category,
        get_subcategory_by_slug,
        get_subcategory,
        create_subcategory,
        update_subcategory,
        toggle_status,
        reorder_subcategories,
        delete_subcategory,
    ),
    components(
        schemas(
            Subcategory,
            SubcategoryWithCounts,
            SubcategoryDetail,
            SubcategoryStats,
            ParentSummary,
            CreateSubcategory,
            UpdateSubcategory,
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
        (name = "Subcategories", description = "Second level of the catalog, scoped to a category")
    )
)]
pub struct ApiDoc;

pub fn router(service: Arc<SubcategoryService>) -> Router {
    Router::new()
        .route("/", get(list_subcategories).post(create_subcategory))
        .route("/active", get(active_subcategories))
        .route("/stats", get(subcategory_stats))
        .route("/reorder", put(reorder_subcategories))
        .route("/category/{category_id}", get(subcategories_by_category))
        .route("/slug/{slug}", get(get_subcategory_by_slug))
        .route(
            "/{id}",
            get(get_subcategory)
                .put(update_subcategory)
                .delete(delete_subcategory),
        )
        .route("/{id}/toggle-status", patch(toggle_status))
        .with_state(service)
}

/// List subcategories with parent summary and product count
#[utoipa::path(
    get,
    path = "",
    tag = "Subcategories",
    params(SubcategoryFilter),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Page of subcategories", body = ApiResponse<Vec<SubcategoryWithCounts>>),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_subcategories(
    State(service): State<Arc<SubcategoryService>>,
    Query(filter): Query<SubcategoryFilter>,
) -> CatalogResult<impl IntoResponse> {
    let (subcategories, pagination) = service.list(filter).await?;
    Ok(ApiResponse::paginated(subcategories, pagination))
}

#[utoipa::path(
    get,
    path = "/active",
    tag = "Subcategories",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active subcategories", body = ApiResponse<Vec<Subcategory>>)
    )
)]
async fn active_subcategories(State(service): State<Arc<SubcategoryService>>) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.active().await?))
}

#[utoipa::path(
    get,
    path = "/stats",
    tag = "Subcategories",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Subcategory statistics", body = ApiResponse<SubcategoryStats>)
    )
)]
async fn subcategory_stats(State(service): State<Arc<SubcategoryService>>) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.stats().await?))
}

/// Subcategories of one category
#[utoipa::path(
    get,
    path = "/category/{category_id}",
    tag = "Subcategories",
    params(("category_id" = uuid::Uuid, Path, description = "Category id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Subcategories of the category", body = ApiResponse<Vec<Subcategory>>),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn subcategories_by_category(
    State(service): State<Arc<SubcategoryService>>,
    UuidPath(category_id): UuidPath,
) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.by_category(category_id).await?))
}

#[utoipa::path(
    get,
    path = "/slug/{slug}",
    tag = "Subcategories",
    params(("slug" = String, Path, description = "Subcategory slug")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Subcategory found", body = ApiResponse<Subcategory>),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_subcategory_by_slug(
    State(service): State<Arc<SubcategoryService>>,
    Path(slug): Path<String>,
) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.get_by_slug(&slug).await?))
}

/// Subcategory with its parent and active products
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Subcategories",
    params(("id" = uuid::Uuid, Path, description = "Subcategory id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Subcategory found", body = ApiResponse<SubcategoryDetail>),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_subcategory(
    State(service): State<Arc<SubcategoryService>>,
    UuidPath(id): UuidPath,
) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.get(id).await?))
}

/// Create a subcategory under an active category
#[utoipa::path(
    post,
    path = "",
    tag = "Subcategories",
    request_body = CreateSubcategory,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Subcategory created", body = ApiResponse<Subcategory>),
        (status = 400, response = BadRequestRuleResponse),
        (status = 401, response = UnauthorizedResponse)
    )
)]
async fn create_subcategory(
    State(service): State<Arc<SubcategoryService>>,
    actor: AuthUser,
    ValidatedJson(input): ValidatedJson<CreateSubcategory>,
) -> CatalogResult<impl IntoResponse> {
    let subcategory = service.create(&actor, input).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Subcategory created successfully", subcategory),
    ))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Subcategories",
    params(("id" = uuid::Uuid, Path, description = "Subcategory id")),
    request_body = UpdateSubcategory,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Subcategory updated", body = ApiResponse<Subcategory>),
        (status = 400, response = BadRequestRuleResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn update_subcategory(
    State(service): State<Arc<SubcategoryService>>,
    actor: AuthUser,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateSubcategory>,
) -> CatalogResult<impl IntoResponse> {
    let subcategory = service.update(&actor, id, input).await?;
    Ok(ApiResponse::with_message("Subcategory updated successfully", subcategory))
}

/// Activation requires an active parent; deactivation cascades to products
#[utoipa::path(
    patch,
    path = "/{id}/toggle-status",
    tag = "Subcategories",
    params(("id" = uuid::Uuid, Path, description = "Subcategory id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Status toggled", body = ApiResponse<Subcategory>),
        (status = 400, response = BadRequestRuleResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn toggle_status(
    State(service): State<Arc<SubcategoryService>>,
    actor: AuthUser,
    UuidPath(id): UuidPath,
) -> CatalogResult<impl IntoResponse> {
    let subcategory = service.toggle_status(&actor, id).await?;
    let message = if subcategory.is_active {
        "Subcategory activated successfully"
    } else {
        "Subcategory deactivated successfully"
    };
    Ok(ApiResponse::with_message(message, subcategory))
}

#[utoipa::path(
    put,
    path = "/reorder",
    tag = "Subcategories",
    request_body = ReorderRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Order updated", body = MessageResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn reorder_subcategories(
    State(service): State<Arc<SubcategoryService>>,
    actor: AuthUser,
    ValidatedJson(request): ValidatedJson<ReorderRequest>,
) -> CatalogResult<impl IntoResponse> {
    service.reorder(&actor, request.items).await?;
    Ok(MessageResponse::new("Subcategory order updated successfully"))
}

/// Delete a subcategory without products (admin only)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Subcategories",
    params(("id" = uuid::Uuid, Path, description = "Subcategory id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Subcategory deleted", body = MessageResponse),
        (status = 400, response = BadRequestRuleResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn delete_subcategory(
    State(service): State<Arc<SubcategoryService>>,
    actor: AuthUser,
    UuidPath(id): UuidPath,
) -> CatalogResult<impl IntoResponse> {
    service.delete(&actor, id).await?;
    Ok(MessageResponse::new("Subcategory deleted successfully"))
}
