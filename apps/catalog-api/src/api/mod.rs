//! API routes, nested under `/api` by `axum_helpers::create_router`.

pub mod health;

use axum::{Router, middleware::from_fn_with_state};
use axum_helpers::JwtAuth;
use domain_catalog::{
    CatalogStore, CategoryService, MongoCategoryRepository, MongoProductRepository, MongoSubcategoryRepository,
    ProductService, SubcategoryService, handlers as catalog,
};
use domain_users::{AuthState, MongoUserRepository, UserService, auth_handlers, authenticate, handlers as users};
use mongodb::Database;
use std::sync::Arc;

use crate::state::AppState;

/// Creates the indexes of every collection; safe to run on each start.
pub async fn init_indexes(db: &Database) -> eyre::Result<()> {
    MongoUserRepository::new(db).init_indexes().await?;
    MongoCategoryRepository::new(db).init_indexes().await?;
    MongoSubcategoryRepository::new(db).init_indexes().await?;
    MongoProductRepository::new(db).init_indexes().await?;
    Ok(())
}

/// Repositories and services built once at startup
pub struct Services {
    pub users: Arc<UserService<MongoUserRepository>>,
    pub categories: Arc<CategoryService>,
    pub subcategories: Arc<SubcategoryService>,
    pub products: Arc<ProductService>,
}

impl Services {
    pub fn new(state: &AppState) -> Self {
        let store = CatalogStore::new(
            MongoCategoryRepository::new(&state.db),
            MongoSubcategoryRepository::new(&state.db),
            MongoProductRepository::new(&state.db),
        );

        Self {
            users: Arc::new(UserService::new(MongoUserRepository::new(&state.db))),
            categories: Arc::new(CategoryService::new(store.clone())),
            subcategories: Arc::new(SubcategoryService::new(store.clone())),
            products: Arc::new(ProductService::new(store)),
        }
    }
}

/// `/auth/login` and `/ready` are public; everything else needs a valid token
/// belonging to an active user.
pub fn routes(state: &AppState, services: &Services) -> Router {
    let auth = AuthState::new(
        Arc::clone(&services.users),
        JwtAuth::new(&state.config.jwt),
        state.config.environment.is_production(),
    );

    let protected = Router::new()
        .nest("/users", users::router(Arc::clone(&services.users)))
        .nest("/categories", catalog::categories::router(Arc::clone(&services.categories)))
        .nest(
            "/subcategories",
            catalog::subcategories::router(Arc::clone(&services.subcategories)),
        )
        .nest("/products", catalog::products::router(Arc::clone(&services.products)))
        .route_layer(from_fn_with_state(auth.clone(), authenticate::<MongoUserRepository>));

    Router::new()
        .nest("/auth", auth_handlers::router(auth))
        .merge(protected)
        .merge(health::router(state.clone()))
}
