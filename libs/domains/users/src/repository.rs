use async_trait::async_trait;
use axum_helpers::PageQuery;
use uuid::Uuid;

use crate::error::UserResult;
use crate::models::{User, UserFilter, UserStats};

/// Repository trait for User persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> UserResult<User>;

    async fn find_by_id(&self, id: Uuid) -> UserResult<Option<User>>;

    /// Look up by email (case-insensitive) or exact username
    async fn find_by_login(&self, login: &str) -> UserResult<Option<User>>;

    /// Whether another user already holds `username` or `email`
    async fn username_or_email_taken(
        &self,
        username: &str,
        email: &str,
        exclude: Option<Uuid>,
    ) -> UserResult<bool>;

    /// One page of users, newest first, plus the total matching `filter`
    async fn list(&self, filter: &UserFilter, page: PageQuery) -> UserResult<(Vec<User>, u64)>;

    /// Replace the stored document; `NotFound` when it vanished
    async fn update(&self, user: User) -> UserResult<User>;

    async fn delete(&self, id: Uuid) -> UserResult<bool>;

    async fn record_login(&self, id: Uuid) -> UserResult<()>;

    async fn update_password(&self, id: Uuid, password_hash: String) -> UserResult<()>;

    async fn stats(&self) -> UserResult<UserStats>;

    async fn admin_exists(&self) -> UserResult<bool>;
}
