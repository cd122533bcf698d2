//! Readiness probe

use axum::{Router, extract::State, response::Response, routing::get};
use axum_helpers::{HealthCheckFuture, run_health_checks};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(readiness_check))
        .with_state(state)
}

/// 503 until MongoDB answers a ping
async fn readiness_check(State(state): State<AppState>) -> Response {
    let mongodb: HealthCheckFuture = Box::pin(async move {
        let status = database::mongodb::check_health_detailed(&state.mongo_client).await;
        if status.healthy {
            tracing::debug!(response_time_ms = status.response_time_ms, "MongoDB ping ok");
            Ok(())
        } else {
            Err(status.message.unwrap_or_else(|| "ping failed".to_string()))
        }
    });

    run_health_checks(vec![("mongodb", mongodb)]).await
}
