//! Users domain: back-office accounts, password login and the request principal.
//!
//! ```text
//! auth_handlers / handlers   HTTP endpoints
//!          │
//!       service              role rules, Argon2 hashing, login
//!          │
//!     repository             trait + MongoDB implementation
//! ```
//!
//! Every route except `POST /auth/login` runs behind [`auth::authenticate`],
//! which resolves the [`AuthUser`] handlers act as.

pub mod auth;
pub mod auth_handlers;
pub mod error;
pub mod handlers;
pub mod models;
pub mod mongodb;
pub mod repository;
pub mod service;

pub use auth::{AuthState, AuthUser, authenticate};
pub use error::{UserError, UserResult};
pub use handlers::ApiDoc;
pub use models::{CreateUser, LoginRequest, Role, UpdateUser, User, UserFilter, UserResponse};
pub use mongodb::MongoUserRepository;
pub use repository::UserRepository;
pub use service::{AdminBootstrap, UserService};
