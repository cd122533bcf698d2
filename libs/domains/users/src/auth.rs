//! Authenticated principal and the middleware that resolves it.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_helpers::{AppError, JwtAuth, auth::extract_token_from_request};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::UserError;
use crate::models::Role;
use crate::repository::UserRepository;
use crate::service::UserService;

/// The user a request acts as, resolved from the token and the users collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Shared by the auth routes and the `authenticate` middleware
pub struct AuthState<R: UserRepository> {
    pub service: Arc<UserService<R>>,
    pub jwt: JwtAuth,
    /// Adds `Secure` to the session cookie
    pub secure_cookies: bool,
}

impl<R: UserRepository> Clone for AuthState<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            jwt: self.jwt.clone(),
            secure_cookies: self.secure_cookies,
        }
    }
}

impl<R: UserRepository> AuthState<R> {
    pub fn new(service: Arc<UserService<R>>, jwt: JwtAuth, secure_cookies: bool) -> Self {
        Self {
            service,
            jwt,
            secure_cookies,
        }
    }
}

/// Verifies the token, then requires the user behind it to exist and be active.
///
/// Inserts both the [`JwtClaims`](axum_helpers::JwtClaims) and the [`AuthUser`].
pub async fn authenticate<R: UserRepository + 'static>(
    State(state): State<AuthState<R>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token_from_request(request.headers())
        .ok_or_else(|| AppError::Unauthorized("No token provided".to_string()))?;

    let claims = state.jwt.verify_token(&token)?;
    let user_id = claims.user_id()?;

    let principal = state
        .service
        .resolve_principal(user_id)
        .await
        .map_err(|e| match e {
            UserError::NotFound(_) => AppError::Unauthorized("User not found".to_string()),
            UserError::Inactive => AppError::Unauthorized("Account is inactive".to_string()),
            other => other.into(),
        })?;

    tracing::debug!(user_id = %principal.id, role = %principal.role, "Authenticated request");

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}
