//! Login and session endpoints mounted under `/auth`.
//!
//! Tokens are stateless: logout only clears the cookie and asks the client to
//! drop its copy.

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, header},
    middleware::from_fn_with_state,
    response::{AppendHeaders, IntoResponse},
    routing::{get, post, put},
};
use axum_helpers::{
    ApiResponse, MessageResponse, ValidatedJson,
    errors::responses::{
        BadRequestValidationResponse, InternalServerErrorResponse, UnauthorizedResponse,
    },
};
use utoipa::OpenApi;

use crate::auth::{AuthState, AuthUser, authenticate};
use crate::error::{UserError, UserResult};
use crate::models::{ChangePasswordRequest, LoginRequest, LoginResponse, UserResponse};
use crate::repository::UserRepository;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

#[derive(OpenApi)]
#[openapi(
    paths(login, me, change_password, logout, verify),
    components(
        schemas(LoginRequest, LoginResponse, ChangePasswordRequest, AuthUser),
        responses(BadRequestValidationResponse, UnauthorizedResponse, InternalServerErrorResponse)
    ),
    tags(
        (name = "Auth", description = "Login and current-session endpoints")
    )
)]
pub struct ApiDoc;

/// `/login` is public; the rest run behind [`authenticate`].
pub fn router<R: UserRepository + 'static>(state: AuthState<R>) -> Router {
    Router::new()
        .route("/me", get(me::<R>))
        .route("/change-password", put(change_password::<R>))
        .route("/logout", post(logout::<R>))
        .route("/verify", get(verify))
        .route_layer(from_fn_with_state(state.clone(), authenticate::<R>))
        .route("/login", post(login::<R>))
        .with_state(state)
}

fn session_cookie(value: &str, max_age: i64, secure: bool) -> UserResult<HeaderValue> {
    let secure_flag = if secure { " Secure;" } else { "" };
    let cookie = format!(
        "{ACCESS_TOKEN_COOKIE}={value}; HttpOnly;{secure_flag} SameSite=Strict; Path=/; Max-Age={max_age}"
    );

    HeaderValue::from_str(&cookie)
        .map_err(|e| UserError::Internal(format!("Failed to create cookie: {e}")))
}

/// Exchange credentials for an access token
#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; token also set as an HttpOnly cookie", body = ApiResponse<LoginResponse>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse)
    )
)]
async fn login<R: UserRepository>(
    State(state): State<AuthState<R>>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> UserResult<impl IntoResponse> {
    let user = state.service.login(&request).await?;

    let token = state
        .jwt
        .create_token(user.id, &user.username, &user.role.to_string())
        .map_err(|e| {
            tracing::error!("Failed to create access token: {:?}", e);
            UserError::Internal("Failed to create token".to_string())
        })?;

    let expires_in = state.jwt.expires_in_secs();
    let cookie = session_cookie(&token, expires_in, state.secure_cookies)?;

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        ApiResponse::with_message(
            "Login successful",
            LoginResponse {
                token,
                expires_in,
                user,
            },
        ),
    ))
}

/// Profile of the authenticated user
#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserResponse>),
        (status = 401, response = UnauthorizedResponse)
    )
)]
async fn me<R: UserRepository>(
    State(state): State<AuthState<R>>,
    actor: AuthUser,
) -> UserResult<impl IntoResponse> {
    Ok(ApiResponse::ok(state.service.current_user(actor.id).await?))
}

#[utoipa::path(
    put,
    path = "/change-password",
    tag = "Auth",
    request_body = ChangePasswordRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse)
    )
)]
async fn change_password<R: UserRepository>(
    State(state): State<AuthState<R>>,
    actor: AuthUser,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> UserResult<impl IntoResponse> {
    state.service.change_password(actor.id, request).await?;
    Ok(MessageResponse::new("Password updated successfully"))
}

/// Clears the session cookie
#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    )
)]
async fn logout<R: UserRepository>(
    State(state): State<AuthState<R>>,
    actor: AuthUser,
) -> UserResult<impl IntoResponse> {
    tracing::info!(user_id = %actor.id, "User logged out");

    let cookie = session_cookie("", 0, state.secure_cookies)?;
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        MessageResponse::new("Logged out successfully, discard the access token"),
    ))
}

/// Echoes the principal behind a valid token
#[utoipa::path(
    get,
    path = "/verify",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Token is valid", body = ApiResponse<AuthUser>),
        (status = 401, response = UnauthorizedResponse)
    )
)]
async fn verify(actor: AuthUser) -> impl IntoResponse {
    ApiResponse::with_message("Token is valid", actor)
}
