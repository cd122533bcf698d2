use super::jwt::JwtAuth;
use crate::errors::AppError;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

/// Bearer token from `Authorization`, falling back to an `access_token` cookie.
pub fn extract_token_from_request(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|cookie| {
                let (name, value) = cookie.trim().split_once('=')?;
                (name == "access_token" && !value.is_empty()).then(|| value.to_string())
            })
        })
}

/// Verifies the token and inserts [`JwtClaims`](super::JwtClaims) into request extensions.
///
/// Does not look the user up; domain middleware layered inside this one can.
pub async fn jwt_auth_middleware(
    State(auth): State<JwtAuth>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token_from_request(request.headers())
        .ok_or_else(|| AppError::Unauthorized("No token provided".to_string()))?;

    let claims = auth.verify_token(&token)?;
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
