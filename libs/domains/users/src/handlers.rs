//! HTTP handlers for the Users API

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use axum_helpers::{
    ApiResponse, MessageResponse, Pagination, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestIdResponse, BadRequestRuleResponse, BadRequestValidationResponse,
        ForbiddenResponse, InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::auth::AuthUser;
use crate::error::UserResult;
use crate::models::{CreateUser, Role, UpdateUser, UserFilter, UserResponse, UserStats};
use crate::repository::UserRepository;
use crate::service::UserService;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_users,
        user_stats,
        get_user,
        create_user,
        update_user,
        delete_user,
        toggle_status,
    ),
    components(
        schemas(UserResponse, CreateUser, UpdateUser, UserStats, Role, Pagination),
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
        (name = "Users", description = "Back-office account management")
    )
)]
pub struct ApiDoc;

/// Users router; every route expects an [`AuthUser`] in request extensions.
pub fn router<R: UserRepository + 'static>(service: Arc<UserService<R>>) -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/stats", get(user_stats))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/{id}/toggle-status", patch(toggle_status))
        .with_state(service)
}

/// List users (admin only)
#[utoipa::path(
    get,
    path = "",
    tag = "Users",
    params(UserFilter),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Page of users", body = ApiResponse<Vec<UserResponse>>),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    actor: AuthUser,
    Query(filter): Query<UserFilter>,
) -> UserResult<impl IntoResponse> {
    let (users, pagination) = service.list_users(&actor, filter).await?;
    Ok(ApiResponse::paginated(users, pagination))
}

/// Account counts by status and role (admin only)
#[utoipa::path(
    get,
    path = "/stats",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User statistics", body = ApiResponse<UserStats>),
        (status = 403, response = ForbiddenResponse)
    )
)]
async fn user_stats<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    actor: AuthUser,
) -> UserResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.stats(&actor).await?))
}

/// Get a user; non-admins may only read themselves
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Users",
    params(("id" = uuid::Uuid, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User found", body = ApiResponse<UserResponse>),
        (status = 400, response = BadRequestIdResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    actor: AuthUser,
    UuidPath(id): UuidPath,
) -> UserResult<impl IntoResponse> {
    Ok(ApiResponse::ok(service.get_user(&actor, id).await?))
}

/// Create a user (admin only)
#[utoipa::path(
    post,
    path = "",
    tag = "Users",
    request_body = CreateUser,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserResponse>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 403, response = ForbiddenResponse)
    )
)]
async fn create_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    actor: AuthUser,
    ValidatedJson(input): ValidatedJson<CreateUser>,
) -> UserResult<impl IntoResponse> {
    let user = service.create_user(&actor, input).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("User created successfully", user),
    ))
}

/// Update a user; non-admins may only edit their own profile and never role or status
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Users",
    params(("id" = uuid::Uuid, Path, description = "User id")),
    request_body = UpdateUser,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserResponse>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn update_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    actor: AuthUser,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateUser>,
) -> UserResult<impl IntoResponse> {
    let user = service.update_user(&actor, id, input).await?;
    Ok(ApiResponse::with_message("User updated successfully", user))
}

/// Delete a user (admin only, never oneself)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Users",
    params(("id" = uuid::Uuid, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, response = BadRequestRuleResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn delete_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    actor: AuthUser,
    UuidPath(id): UuidPath,
) -> UserResult<impl IntoResponse> {
    service.delete_user(&actor, id).await?;
    Ok(MessageResponse::new("User deleted successfully"))
}

/// Activate or deactivate a user (admin only, never oneself)
#[utoipa::path(
    patch,
    path = "/{id}/toggle-status",
    tag = "Users",
    params(("id" = uuid::Uuid, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Status toggled", body = ApiResponse<UserResponse>),
        (status = 400, response = BadRequestRuleResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn toggle_status<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    actor: AuthUser,
    UuidPath(id): UuidPath,
) -> UserResult<impl IntoResponse> {
    let user = service.toggle_status(&actor, id).await?;
    let message = if user.is_active {
        "User activated successfully"
    } else {
        "User deactivated successfully"
    };
    Ok(ApiResponse::with_message(message, user))
}
