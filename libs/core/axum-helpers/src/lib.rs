//! # Axum Helpers
//!
//! Shared HTTP plumbing for the catalog services.
//!
//! - **[`auth`]**: stateless JWT issue/verify and the token middleware
//! - **[`envelope`]**: `{ success, message, data, pagination }` responses
//! - **[`errors`]**: [`AppError`] and the JSON error envelope
//! - **[`extractors`]**: [`UuidPath`], [`ValidatedJson`]
//! - **[`http`]**: CORS and security headers
//! - **[`server`]**: router assembly, health endpoints, graceful shutdown

pub mod auth;
pub mod envelope;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use auth::{JwtAuth, JwtClaims, JwtConfig, TokenError, jwt_auth_middleware};
pub use envelope::{ApiResponse, MessageResponse, PageQuery, Pagination};
pub use errors::{AppError, ErrorCode, ErrorResponse};
pub use extractors::{UuidPath, ValidatedJson};
pub use http::{create_cors_layer, security_headers};
pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app, create_router,
    health_router, run_health_checks, shutdown_signal,
};
