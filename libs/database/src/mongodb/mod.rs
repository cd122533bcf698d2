//! MongoDB connector and helpers shared by the domain repositories

mod config;
mod connector;
mod duplicate;
mod health;
pub mod uuid_string;

pub use config::MongoConfig;
pub use connector::{connect, connect_from_config, connect_from_config_with_retry};
pub use duplicate::{duplicate_key_field, duplicate_key_field_from_message, is_duplicate_key};
pub use health::{HealthStatus, check_health, check_health_detailed};

pub use mongodb::{Client, Collection, Database};
