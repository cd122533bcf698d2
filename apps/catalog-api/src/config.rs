use axum_helpers::JwtConfig;
use core_config::{AppInfo, FromEnv, app_info, env_or_default, server::ServerConfig};
use database::mongodb::MongoConfig;
use domain_users::AdminBootstrap;

pub use core_config::Environment;

const DEFAULT_BOOTSTRAP_PHONE: &str = "+10000000000";

/// Everything the binary reads from the environment at startup
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub mongodb: MongoConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub environment: Environment,
    pub bootstrap: Option<AdminBootstrap>,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let app = app_info!();
        let mongodb = MongoConfig::from_env()?.with_app_name(app.name);
        let server = ServerConfig::from_env()?;
        let jwt = JwtConfig::from_env()?;

        Ok(Self {
            app,
            mongodb,
            server,
            jwt,
            environment,
            bootstrap: bootstrap_from_env(),
        })
    }
}

/// First-run administrator; only when email, username and password are all set.
fn bootstrap_from_env() -> Option<AdminBootstrap> {
    let var = |key: &str| std::env::var(key).ok().filter(|value| !value.trim().is_empty());

    Some(AdminBootstrap {
        email: var("ADMIN_BOOTSTRAP_EMAIL")?,
        username: var("ADMIN_BOOTSTRAP_USERNAME")?,
        password: var("ADMIN_BOOTSTRAP_PASSWORD")?,
        phone: env_or_default("ADMIN_BOOTSTRAP_PHONE", DEFAULT_BOOTSTRAP_PHONE),
    })
}
