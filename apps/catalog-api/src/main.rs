use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use std::time::Duration;
use tracing::{info, warn};

mod api;
mod config;
mod openapi;
mod state;

use api::Services;
use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!(url = %config.mongodb.redacted_url(), "Connecting to MongoDB");
    let mongo_client = database::mongodb::connect_from_config_with_retry(&config.mongodb, None).await?;
    let db = mongo_client.database(config.mongodb.database());
    info!(database = config.mongodb.database(), "Connected to MongoDB");

    api::init_indexes(&db).await?;

    let state = AppState {
        config,
        mongo_client,
        db,
    };
    let services = Services::new(&state);

    if let Some(bootstrap) = state.config.bootstrap.clone() {
        match services.users.bootstrap_admin(bootstrap).await {
            Ok(Some(admin)) => info!(username = %admin.username, "Bootstrap administrator created"),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Bootstrap administrator not created"),
        }
    }

    let api_routes = api::routes(&state, &services);
    let app = axum_helpers::create_router::<openapi::ApiDoc>(api_routes)?
        .merge(health_router(state.config.app.clone()));

    info!("Starting Catalog API (30s shutdown timeout)");

    let mongo_client = state.mongo_client.clone();

    create_production_app(
        app,
        &state.config.server,
        Duration::from_secs(30),
        async move {
            info!("Shutting down: closing MongoDB connections");
            mongo_client.shutdown().await;
            info!("MongoDB connection closed");
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Catalog API shutdown complete");
    Ok(())
}
