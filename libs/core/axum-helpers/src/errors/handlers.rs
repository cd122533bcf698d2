use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::{ErrorCode, ErrorResponse};

/// Router fallback for unknown routes.
pub async fn not_found() -> Response {
    let body = ErrorResponse::new(ErrorCode::NotFound, "Route not found");
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
