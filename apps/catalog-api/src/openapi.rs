//! OpenAPI documentation configuration

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

/// Registers the bearer scheme the operations refer to as `bearer_auth`.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Combined OpenAPI documentation for the catalog back office
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog API",
        version = "0.1.0",
        description = "Back-office API for users, categories, subcategories and products",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    modifiers(&SecurityAddon),
    nest(
        (path = "/api/auth", api = domain_users::auth_handlers::ApiDoc),
        (path = "/api/users", api = domain_users::ApiDoc),
        (path = "/api/categories", api = domain_catalog::handlers::categories::ApiDoc),
        (path = "/api/subcategories", api = domain_catalog::handlers::subcategories::ApiDoc),
        (path = "/api/products", api = domain_catalog::handlers::products::ApiDoc)
    )
)]
pub struct ApiDoc;
