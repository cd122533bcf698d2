use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(Uuid),

    #[error("Username or email already exists")]
    Duplicate,

    #[error("Credentials are required")]
    MissingCredentials,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is inactive")]
    Inactive,

    #[error("Current password is incorrect")]
    WrongPassword,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Self-targeted operations an admin may not perform
    #[error("{0}")]
    SelfAction(&'static str),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) => AppError::NotFound("User not found".to_string()),
            UserError::Duplicate => {
                AppError::BadRequest("Username or email already exists".to_string())
            }
            UserError::MissingCredentials => {
                AppError::BadRequest("Credentials are required".to_string())
            }
            UserError::InvalidCredentials => {
                AppError::Unauthorized("Invalid credentials".to_string())
            }
            UserError::Inactive => AppError::Unauthorized("Account is inactive".to_string()),
            UserError::WrongPassword => {
                AppError::Unauthorized("Current password is incorrect".to_string())
            }
            UserError::Validation(msg) => AppError::BadRequest(msg),
            UserError::Forbidden(msg) => AppError::Forbidden(msg),
            UserError::SelfAction(msg) => AppError::BadRequest(msg.to_string()),
            UserError::PasswordHash(msg) => AppError::InternalServerError(msg),
            UserError::Database(e) => AppError::Database(e),
            UserError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
