use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

use crate::rules::RuleViolation;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A hierarchy rule refused the write
    #[error(transparent)]
    Rule(#[from] RuleViolation),

    #[error("A product with SKU '{0}' already exists")]
    DuplicateSku(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(entity) => AppError::NotFound(format!("{entity} not found")),
            CatalogError::Rule(violation) => AppError::BadRequest(violation.to_string()),
            CatalogError::DuplicateSku(sku) => {
                AppError::BadRequest(format!("A product with SKU '{sku}' already exists"))
            }
            CatalogError::Validation(msg) => AppError::BadRequest(msg),
            CatalogError::Forbidden(msg) => AppError::Forbidden(msg),
            CatalogError::Database(e) => AppError::Database(e),
            CatalogError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            CatalogError::NotFound("Category").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CatalogError::Rule(RuleViolation::SubcategoryMismatch)
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CatalogError::Forbidden("Admin access required".into())
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            CatalogError::Internal("boom".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(CatalogError::NotFound("Product").to_string(), "Product not found");
    }
}
