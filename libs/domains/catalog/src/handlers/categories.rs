//! HTTP handlers for the Categories API

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
    Category, CategoryDetail, CategoryFilter, CategoryStats, CategoryWithCounts, CreateCategory, ReorderItem,
    ReorderRequest, UpdateCategory,
};
use crate::service::CategoryService;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_categories,
        active_categories,
        category_stats,
        get_category_by_slug,
        get_category,
        create_category,
        update_category,
        toggle_status,
        reorder_categories,
        delete_category,
    ),
    components(
        schemas(
            Category,
            CategoryWithCounts,
            CategoryDetail,
            CategoryStats,
            CreateCategory,
            UpdateCategory,
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
        (name = "Categories", description = "Top level of the catalog")
    )
)]
pub struct ApiDoc;

pub fn router(service: Arc<CategoryService>) -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/active", get(active_categories))
        .route("/stats", get(category_stats))
        .route("/reorder", put(reorder_categories))
        .route("/slug/{slug}", get(get_category_by_slug))
        .route(
            "/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/{id}/toggle-status", patch(toggle_status))
        .with_state(service)
}

/// List categories with their child counts
#[utoipa::path(
    get,
    path = "",
    tag = "Categories",
    params(CategoryFilter),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Page of categories", body = ApiResponse<Vec<CategoryWithCounts>>),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_categories(
    State(service): State<Arc<CategoryService>>,
    Query(filter): Query<CategoryFilter>,
) -> CatalogResult<impl IntoResponse> {
    let (categories, pagination) = service.list(filter).await?;
    Ok(ApiResponse::paginated(categories, pagination))
}

/// Active categories in display order
#[utoipa::path(
    get,
    path = "/active",
    tag = "Categories",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active categories", body = ApiResponse<Vec<Category>>)
    )
)]
async fn active_categories(State(service): State<Arc<CategoryService>>) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.active().await?))
}

#[utoipa::path(
    get,
    path = "/stats",
    tag = "Categories",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Category statistics", body = ApiResponse<CategoryStats>)
    )
)]
async fn category_stats(State(service): State<Arc<CategoryService>>) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.stats().await?))
}

#[utoipa::path(
    get,
    path = "/slug/{slug}",
    tag = "Categories",
    params(("slug" = String, Path, description = "Category slug")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<Category>),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_category_by_slug(
    State(service): State<Arc<CategoryService>>,
    Path(slug): Path<String>,
) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.get_by_slug(&slug).await?))
}

/// Category plus its active subcategories
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Categories",
    params(("id" = uuid::Uuid, Path, description = "Category id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<CategoryDetail>),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_category(
    State(service): State<Arc<CategoryService>>,
    UuidPath(id): UuidPath,
) -> CatalogResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.get(id).await?))
}

#[utoipa::path(
    post,
    path = "",
    tag = "Categories",
    request_body = CreateCategory,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Category created", body = ApiResponse<Category>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse)
    )
)]
async fn create_category(
    State(service): State<Arc<CategoryService>>,
    actor: AuthUser,
    ValidatedJson(input): ValidatedJson<CreateCategory>,
) -> CatalogResult<impl IntoResponse> {
    let category = service.create(&actor, input).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Category created successfully", category),
    ))
}

/// Update a category; deactivation cascades to subcategories and products
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Categories",
    params(("id" = uuid::Uuid, Path, description = "Category id")),
    request_body = UpdateCategory,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<Category>),
        (status = 400, response = BadRequestRuleResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn update_category(
    State(service): State<Arc<CategoryService>>,
    actor: AuthUser,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateCategory>,
) -> CatalogResult<impl IntoResponse> {
    let category = service.update(&actor, id, input).await?;
    Ok(ApiResponse::with_message("Category updated successfully", category))
}

#[utoipa::path(
    patch,
    path = "/{id}/toggle-status",
    tag = "Categories",
    params(("id" = uuid::Uuid, Path, description = "Category id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Status toggled", body = ApiResponse<Category>),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn toggle_status(
    State(service): State<Arc<CategoryService>>,
    actor: AuthUser,
    UuidPath(id): UuidPath,
) -> CatalogResult<impl IntoResponse> {
    let category = service.toggle_status(&actor, id).await?;
    let message = if category.is_active {
        "Category activated successfully"
    } else {
        "Category deactivated successfully"
    };
    Ok(ApiResponse::with_message(message, category))
}

#[utoipa::path(
    put,
    path = "/reorder",
    tag = "Categories",
    request_body = ReorderRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Order updated", body = MessageResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn reorder_categories(
    State(service): State<Arc<CategoryService>>,
    actor: AuthUser,
    ValidatedJson(request): ValidatedJson<ReorderRequest>,
) -> CatalogResult<impl IntoResponse> {
    service.reorder(&actor, request.items).await?;
    Ok(MessageResponse::new("Category order updated successfully"))
}

/// Delete an empty category (admin only)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Categories",
    params(("id" = uuid::Uuid, Path, description = "Category id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Category deleted", body = MessageResponse),
        (status = 400, response = BadRequestRuleResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn delete_category(
    State(service): State<Arc<CategoryService>>,
    actor: AuthUser,
    UuidPath(id): UuidPath,
) -> CatalogResult<impl IntoResponse> {
    service.delete(&actor, id).await?;
    Ok(MessageResponse::new("Category deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MockCategoryRepository, MockProductRepository, MockSubcategoryRepository};
    use crate::service::CatalogStore;
    use crate::service::fixtures::{admin, category, coordinator};
    use axum::{Extension, body::Body, http::Request};
    use http_body_util::BodyExt;
    use std::collections::HashMap;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app(
        categories: MockCategoryRepository,
        subcategories: MockSubcategoryRepository,
        products: MockProductRepository,
        actor: AuthUser,
    ) -> Router {
        let store = CatalogStore::new(categories, subcategories, products);
        router(Arc::new(CategoryService::new(store))).layer(Extension(actor))
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_list_categories_with_counts() {
        let hogar = category("Hogar", true);
        let id = hogar.id;

        let mut categories = MockCategoryRepository::new();
        categories
            .expect_list()
            .withf(|filter, page| filter.is_active == Some(true) && page.page == 1)
            .returning(move |_, _| Ok((vec![hogar.clone()], 1)));
        let mut subcategories = MockSubcategoryRepository::new();
        subcategories
            .expect_count_by_categories()
            .returning(move |_| Ok(HashMap::from([(id, 2)])));
        let mut products = MockProductRepository::new();
        products.expect_count_by_categories().returning(|_| Ok(HashMap::new()));

        let response = app(categories, subcategories, products, coordinator())
            .oneshot(Request::get("/?isActive=true").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["data"][0]["_id"], id.to_string());
        assert_eq!(body["data"][0]["subcategoriesCount"], 2);
        assert_eq!(body["data"][0]["productsCount"], 0);
        assert_eq!(body["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn test_create_category_returns_201() {
        let mut categories = MockCategoryRepository::new();
        categories.expect_name_taken().returning(|_, _| Ok(false));
        categories.expect_create().returning(Ok);

        let response = app(
            categories,
            MockSubcategoryRepository::new(),
            MockProductRepository::new(),
            coordinator(),
        )
        .oneshot(
            Request::post("/")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":"Hogar y Jardín","description":"Casa"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json(response).await;
        assert_eq!(body["message"], "Category created successfully");
        assert_eq!(body["data"]["slug"], "hogar-y-jardin");
    }

    #[tokio::test]
    async fn test_create_category_validation() {
        let response = app(
            MockCategoryRepository::new(),
            MockSubcategoryRepository::new(),
            MockProductRepository::new(),
            coordinator(),
        )
        .oneshot(
            Request::post("/")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":"H","description":"Casa","color":"red"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json(response).await;
        assert!(body["details"]["name"].is_array());
        assert!(body["details"]["color"].is_array());
    }

    #[tokio::test]
    async fn test_slug_lookup_not_found() {
        let mut categories = MockCategoryRepository::new();
        categories
            .expect_find_by_slug()
            .withf(|slug| slug.to_string() == "nada")
            .returning(|_| Ok(None));

        let response = app(
            categories,
            MockSubcategoryRepository::new(),
            MockProductRepository::new(),
            coordinator(),
        )
        .oneshot(Request::get("/slug/nada").body(Body::empty()).unwrap())
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["message"], "Category not found");
    }

    #[tokio::test]
    async fn test_delete_forbidden_for_coordinator() {
        let response = app(
            MockCategoryRepository::new(),
            MockSubcategoryRepository::new(),
            MockProductRepository::new(),
            coordinator(),
        )
        .oneshot(
            Request::delete(format!("/{}", Uuid::now_v7()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_delete_guard_is_bad_request() {
        let hogar = category("Hogar", true);
        let id = hogar.id;

        let mut categories = MockCategoryRepository::new();
        categories
            .expect_find_by_id()
            .returning(move |_| Ok(Some(hogar.clone())));
        let mut subcategories = MockSubcategoryRepository::new();
        subcategories.expect_count_by_category().returning(|_| Ok(0));
        let mut products = MockProductRepository::new();
        products.expect_count_by_category().returning(|_| Ok(3));

        let response = app(categories, subcategories, products, admin())
            .oneshot(Request::delete(format!("/{id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json(response).await["message"],
            "Cannot delete category: it still has 3 products"
        );
    }

    #[tokio::test]
    async fn test_reorder_rejects_empty_items() {
        let response = app(
            MockCategoryRepository::new(),
            MockSubcategoryRepository::new(),
            MockProductRepository::new(),
            coordinator(),
        )
        .oneshot(
            Request::put("/reorder")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"items":[]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_toggle_message() {
        let hogar = category("Hogar", true);
        let id = hogar.id;

        let mut categories = MockCategoryRepository::new();
        categories
            .expect_find_by_id()
            .returning(move |_| Ok(Some(hogar.clone())));
        categories.expect_update().returning(Ok);
        let mut subcategories = MockSubcategoryRepository::new();
        subcategories.expect_deactivate_by_category().returning(|_, _| Ok(0));
        let mut products = MockProductRepository::new();
        products.expect_deactivate_by_category().returning(|_, _| Ok(0));

        let response = app(categories, subcategories, products, coordinator())
            .oneshot(
                Request::patch(format!("/{id}/toggle-status"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["message"], "Category deactivated successfully");
        assert_eq!(body["data"]["isActive"], false);
    }
}
