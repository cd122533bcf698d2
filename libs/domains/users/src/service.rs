use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum_helpers::{PageQuery, Pagination};
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{UserError, UserResult};
use crate::models::{
    ChangePasswordRequest, CreateUser, LoginRequest, Role, UpdateUser, User, UserFilter,
    UserResponse, UserStats,
};
use crate::repository::UserRepository;

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// First administrator created at startup when none exists yet
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub username: String,
    pub password: String,
    pub phone: String,
}

/// Service layer for User business logic
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> Clone for UserService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    #[instrument(skip(self, actor, input), fields(actor = %actor.id, username = %input.username))]
    pub async fn create_user(&self, actor: &AuthUser, input: CreateUser) -> UserResult<UserResponse> {
        require_admin(actor)?;

        if self
            .repository
            .username_or_email_taken(&input.username, &input.email, None)
            .await?
        {
            return Err(UserError::Duplicate);
        }

        let password_hash = hash_password(&input.password)?;
        let user = User::new(input, password_hash, Some(actor.id));

        let created = self.repository.create(user).await?;
        Ok(created.into())
    }

    /// Admins may read anyone; everybody else only themselves
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn get_user(&self, actor: &AuthUser, id: Uuid) -> UserResult<UserResponse> {
        if !actor.is_admin() && actor.id != id {
            return Err(UserError::Forbidden(
                "You can only view your own profile".to_string(),
            ));
        }

        self.current_user(id).await
    }

    pub async fn current_user(&self, id: Uuid) -> UserResult<UserResponse> {
        let user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;
        Ok(user.into())
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn list_users(
        &self,
        actor: &AuthUser,
        filter: UserFilter,
    ) -> UserResult<(Vec<UserResponse>, Pagination)> {
        require_admin(actor)?;

        let page = PageQuery::new(filter.page, filter.limit);
        let (users, total) = self.repository.list(&filter, page).await?;

        Ok((
            users.into_iter().map(UserResponse::from).collect(),
            Pagination::new(page, total),
        ))
    }

    pub async fn stats(&self, actor: &AuthUser) -> UserResult<UserStats> {
        require_admin(actor)?;
        self.repository.stats().await
    }

    #[instrument(skip(self, actor, input), fields(actor = %actor.id))]
    pub async fn update_user(
        &self,
        actor: &AuthUser,
        id: Uuid,
        input: UpdateUser,
    ) -> UserResult<UserResponse> {
        if !actor.is_admin() {
            if actor.id != id {
                return Err(UserError::Forbidden(
                    "You can only update your own profile".to_string(),
                ));
            }
            if input.touches_privileged_fields() {
                return Err(UserError::Forbidden(
                    "Only administrators can change role or status".to_string(),
                ));
            }
        } else if actor.id == id {
            if input.is_active == Some(false) {
                return Err(UserError::SelfAction("You cannot change your own status"));
            }
            if input.role.as_ref().is_some_and(|role| *role != Role::Admin) {
                return Err(UserError::SelfAction("You cannot change your own role"));
            }
        }

        if input.password.is_some() {
            return Err(UserError::Validation(
                "Password cannot be changed here, use /auth/change-password".to_string(),
            ));
        }

        let mut user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        let username_changed = input
            .username
            .as_deref()
            .is_some_and(|username| username != user.username);
        let email_changed = input
            .email
            .as_deref()
            .is_some_and(|email| !email.eq_ignore_ascii_case(&user.email));

        if username_changed || email_changed {
            let username = input.username.as_deref().unwrap_or(&user.username);
            let email = input.email.as_deref().unwrap_or(&user.email);
            if self
                .repository
                .username_or_email_taken(username, email, Some(id))
                .await?
            {
                return Err(UserError::Duplicate);
            }
        }

        user.apply_update(input, actor.id);

        let updated = self.repository.update(user).await?;
        Ok(updated.into())
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn delete_user(&self, actor: &AuthUser, id: Uuid) -> UserResult<()> {
        require_admin(actor)?;

        if actor.id == id {
            return Err(UserError::SelfAction("You cannot delete your own user"));
        }

        if !self.repository.delete(id).await? {
            return Err(UserError::NotFound(id));
        }

        Ok(())
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn toggle_status(&self, actor: &AuthUser, id: Uuid) -> UserResult<UserResponse> {
        require_admin(actor)?;

        if actor.id == id {
            return Err(UserError::SelfAction("You cannot change your own status"));
        }

        let mut user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        user.is_active = !user.is_active;
        user.updated_by = Some(actor.id);
        user.updated_at = Utc::now();

        let updated = self.repository.update(user).await?;
        tracing::info!(user_id = %id, is_active = updated.is_active, "User status toggled");
        Ok(updated.into())
    }

    /// Checks credentials and records the login time.
    ///
    /// Unknown users and wrong passwords are indistinguishable to the caller.
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: &LoginRequest) -> UserResult<UserResponse> {
        let (login, password) = request.credentials().ok_or(UserError::MissingCredentials)?;

        let mut user = self
            .repository
            .find_by_login(&login)
            .await?
            .ok_or(UserError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "Rejected login: wrong password");
            return Err(UserError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(UserError::Inactive);
        }

        self.repository.record_login(user.id).await?;
        user.last_login = Some(Utc::now());

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(user.into())
    }

    #[instrument(skip(self, request))]
    pub async fn change_password(&self, id: Uuid, request: ChangePasswordRequest) -> UserResult<()> {
        let (Some(current), Some(new)) = (
            request.current_password.filter(|p| !p.is_empty()),
            request.new_password.filter(|p| !p.is_empty()),
        ) else {
            return Err(UserError::Validation(
                "Current password and new password are required".to_string(),
            ));
        };

        if new.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(UserError::Validation(format!(
                "New password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        if !verify_password(&current, &user.password_hash)? {
            return Err(UserError::WrongPassword);
        }

        self.repository
            .update_password(id, hash_password(&new)?)
            .await
    }

    /// Principal behind a verified token: the user must still exist and be active.
    pub async fn resolve_principal(&self, id: Uuid) -> UserResult<AuthUser> {
        let user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        if !user.is_active {
            return Err(UserError::Inactive);
        }

        Ok(AuthUser {
            id: user.id,
            username: user.username,
            role: user.role,
        })
    }

    /// Creates the first admin account; a no-op once any admin exists.
    #[instrument(skip(self, bootstrap), fields(username = %bootstrap.username))]
    pub async fn bootstrap_admin(&self, bootstrap: AdminBootstrap) -> UserResult<Option<UserResponse>> {
        if self.repository.admin_exists().await? {
            tracing::debug!("Admin already present, skipping bootstrap");
            return Ok(None);
        }

        let input = CreateUser {
            username: bootstrap.username,
            email: bootstrap.email,
            password: bootstrap.password,
            first_name: "System".to_string(),
            last_name: "Administrator".to_string(),
            phone: bootstrap.phone,
            role: Some(Role::Admin),
            is_active: Some(true),
        };
        validator::Validate::validate(&input)
            .map_err(|e| UserError::Validation(format!("Invalid bootstrap admin: {e}")))?;

        let password_hash = hash_password(&input.password)?;
        let created = self.repository.create(User::new(input, password_hash, None)).await?;

        tracing::info!(user_id = %created.id, "Bootstrap admin created");
        Ok(Some(created.into()))
    }
}

fn require_admin(actor: &AuthUser) -> UserResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(UserError::Forbidden("Admin access required".to_string()))
    }
}

pub fn hash_password(password: &str) -> UserResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> UserResult<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| UserError::PasswordHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockUserRepository;
    use mockall::predicate::eq;

    fn admin() -> AuthUser {
        AuthUser {
            id: Uuid::now_v7(),
            username: "admin".into(),
            role: Role::Admin,
        }
    }

    fn coordinator() -> AuthUser {
        AuthUser {
            id: Uuid::now_v7(),
            username: "coord".into(),
            role: Role::Coordinador,
        }
    }

    fn stored_user(id: Uuid, password: &str) -> User {
        let now = Utc::now();
        User {
            id,
            username: "coord".into(),
            email: "coord@shop.com".into(),
            password_hash: hash_password(password).unwrap(),
            first_name: "Ana".into(),
            last_name: "Pérez".into(),
            role: Role::Coordinador,
            is_active: true,
            phone: "+34600123456".into(),
            last_login: None,
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn create_input() -> CreateUser {
        CreateUser {
            username: "newbie".into(),
            email: "newbie@shop.com".into(),
            password: "secret1".into(),
            first_name: "New".into(),
            last_name: "Bie".into(),
            phone: "+34600000000".into(),
            role: None,
            is_active: None,
        }
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret1", &hash).unwrap());
        assert!(!verify_password("secret2", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_create_user_requires_admin() {
        let service = UserService::new(MockUserRepository::new());

        let result = service.create_user(&coordinator(), create_input()).await;
        assert!(matches!(result, Err(UserError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicates() {
        let mut mock = MockUserRepository::new();
        mock.expect_username_or_email_taken()
            .returning(|_, _, _| Ok(true));
        mock.expect_create().never();

        let service = UserService::new(mock);
        let result = service.create_user(&admin(), create_input()).await;
        assert!(matches!(result, Err(UserError::Duplicate)));
    }

    #[tokio::test]
    async fn test_create_user_hashes_and_stamps_creator() {
        let actor = admin();
        let actor_id = actor.id;

        let mut mock = MockUserRepository::new();
        mock.expect_username_or_email_taken()
            .returning(|_, _, _| Ok(false));
        mock.expect_create()
            .withf(move |user| {
                user.created_by == Some(actor_id)
                    && user.password_hash != "secret1"
                    && user.role == Role::Coordinador
            })
            .returning(Ok);

        let service = UserService::new(mock);
        let created = service.create_user(&actor, create_input()).await.unwrap();
        assert_eq!(created.full_name, "New Bie");
    }

    #[tokio::test]
    async fn test_coordinator_can_only_read_self() {
        let actor = coordinator();
        let own_id = actor.id;

        let mut mock = MockUserRepository::new();
        mock.expect_find_by_id()
            .with(eq(own_id))
            .returning(|id| Ok(Some(stored_user(id, "secret1"))));

        let service = UserService::new(mock);
        assert!(service.get_user(&actor, own_id).await.is_ok());

        let other = service.get_user(&actor, Uuid::now_v7()).await;
        assert!(matches!(other, Err(UserError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_coordinator_update_rules() {
        let actor = coordinator();
        let service = UserService::new(MockUserRepository::new());

        let other = service
            .update_user(&actor, Uuid::now_v7(), UpdateUser::default())
            .await;
        match other {
            Err(UserError::Forbidden(msg)) => {
                assert_eq!(msg, "You can only update your own profile")
            }
            other => panic!("unexpected: {other:?}"),
        }

        let promote = UpdateUser {
            role: Some(Role::Admin),
            ..Default::default()
        };
        let result = service.update_user(&actor, actor.id, promote).await;
        assert!(matches!(result, Err(UserError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_admin_may_change_role_and_status() {
        let target = Uuid::now_v7();

        let mut mock = MockUserRepository::new();
        mock.expect_find_by_id()
            .returning(|id| Ok(Some(stored_user(id, "secret1"))));
        mock.expect_update()
            .withf(|user| user.role == Role::Admin && !user.is_active)
            .returning(Ok);

        let service = UserService::new(mock);
        let update = UpdateUser {
            role: Some(Role::Admin),
            is_active: Some(false),
            ..Default::default()
        };
        let updated = service.update_user(&admin(), target, update).await.unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert!(!updated.is_active);
    }

    #[tokio::test]
    async fn test_update_rejects_taken_username() {
        let target = Uuid::now_v7();

        let mut mock = MockUserRepository::new();
        mock.expect_find_by_id()
            .returning(|id| Ok(Some(stored_user(id, "secret1"))));
        mock.expect_username_or_email_taken()
            .withf(move |username, _, exclude| {
                username.to_string() == "taken" && *exclude == Some(target)
            })
            .returning(|_, _, _| Ok(true));

        let service = UserService::new(mock);
        let update = UpdateUser {
            username: Some("taken".into()),
            ..Default::default()
        };
        let result = service.update_user(&admin(), target, update).await;
        assert!(matches!(result, Err(UserError::Duplicate)));
    }

    #[tokio::test]
    async fn test_update_refuses_password_field() {
        let actor = admin();
        let service = UserService::new(MockUserRepository::new());

        let update = UpdateUser {
            password: Some("another1".into()),
            ..Default::default()
        };
        let result = service.update_user(&actor, actor.id, update).await;
        assert!(matches!(result, Err(UserError::Validation(_))));
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_or_toggle_self() {
        let actor = admin();
        let service = UserService::new(MockUserRepository::new());

        let delete = service.delete_user(&actor, actor.id).await;
        assert!(matches!(
            delete,
            Err(UserError::SelfAction("You cannot delete your own user"))
        ));

        let toggle = service.toggle_status(&actor, actor.id).await;
        assert!(matches!(
            toggle,
            Err(UserError::SelfAction("You cannot change your own status"))
        ));
    }

    #[tokio::test]
    async fn test_admin_cannot_deactivate_or_demote_self_via_update() {
        let actor = admin();
        let mut mock = MockUserRepository::new();
        mock.expect_update().never();
        let service = UserService::new(mock);

        let deactivate = UpdateUser {
            is_active: Some(false),
            ..Default::default()
        };
        let result = service.update_user(&actor, actor.id, deactivate).await;
        assert!(matches!(
            result,
            Err(UserError::SelfAction("You cannot change your own status"))
        ));

        let demote = UpdateUser {
            role: Some(Role::Coordinador),
            ..Default::default()
        };
        let result = service.update_user(&actor, actor.id, demote).await;
        assert!(matches!(
            result,
            Err(UserError::SelfAction("You cannot change your own role"))
        ));
    }

    #[tokio::test]
    async fn test_admin_may_edit_own_profile() {
        let actor = admin();
        let mut mock = MockUserRepository::new();
        mock.expect_find_by_id()
            .with(eq(actor.id))
            .returning(|id| Ok(Some(stored_user(id, "secret1"))));
        mock.expect_update()
            .withf(|user| user.first_name == "Ana María" && user.is_active)
            .returning(Ok);

        let service = UserService::new(mock);
        let update = UpdateUser {
            first_name: Some("Ana María".into()),
            is_active: Some(true),
            ..Default::default()
        };
        let updated = service.update_user(&actor, actor.id, update).await.unwrap();
        assert_eq!(updated.first_name, "Ana María");
    }

    #[tokio::test]
    async fn test_delete_missing_user_is_not_found() {
        let mut mock = MockUserRepository::new();
        mock.expect_delete().returning(|_| Ok(false));

        let service = UserService::new(mock);
        let result = service.delete_user(&admin(), Uuid::now_v7()).await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_toggle_status_flips_flag() {
        let mut mock = MockUserRepository::new();
        mock.expect_find_by_id()
            .returning(|id| Ok(Some(stored_user(id, "secret1"))));
        mock.expect_update().returning(Ok);

        let service = UserService::new(mock);
        let toggled = service.toggle_status(&admin(), Uuid::now_v7()).await.unwrap();
        assert!(!toggled.is_active);
    }

    #[tokio::test]
    async fn test_list_users_paginates() {
        let mut mock = MockUserRepository::new();
        mock.expect_list()
            .withf(|_, page| page.page == 2 && page.limit == 5)
            .returning(|_, _| Ok((vec![stored_user(Uuid::now_v7(), "x")], 6)));

        let service = UserService::new(mock);
        let filter = UserFilter {
            page: Some(2),
            limit: Some(5),
            ..Default::default()
        };
        let (users, pagination) = service.list_users(&admin(), filter).await.unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(pagination.total, 6);
        assert_eq!(pagination.pages, 2);
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let service = UserService::new(MockUserRepository::new());

        let result = service.login(&LoginRequest::default()).await;
        assert!(matches!(result, Err(UserError::MissingCredentials)));
    }

    #[tokio::test]
    async fn test_login_wrong_password_and_unknown_user() {
        let mut mock = MockUserRepository::new();
        mock.expect_find_by_login()
            .with(eq("coord"))
            .returning(|_| Ok(Some(stored_user(Uuid::now_v7(), "secret1"))));
        mock.expect_find_by_login()
            .with(eq("ghost"))
            .returning(|_| Ok(None));
        mock.expect_record_login().never();

        let service = UserService::new(mock);

        let wrong = LoginRequest {
            username: Some("coord".into()),
            password: Some("nope".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.login(&wrong).await,
            Err(UserError::InvalidCredentials)
        ));

        let unknown = LoginRequest {
            username: Some("ghost".into()),
            password: Some("secret1".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.login(&unknown).await,
            Err(UserError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_login_inactive_account() {
        let mut mock = MockUserRepository::new();
        mock.expect_find_by_login().returning(|_| {
            let mut user = stored_user(Uuid::now_v7(), "secret1");
            user.is_active = false;
            Ok(Some(user))
        });

        let service = UserService::new(mock);
        let request = LoginRequest {
            email: Some("coord@shop.com".into()),
            password: Some("secret1".into()),
            ..Default::default()
        };
        assert!(matches!(service.login(&request).await, Err(UserError::Inactive)));
    }

    #[tokio::test]
    async fn test_login_records_last_login() {
        let mut mock = MockUserRepository::new();
        mock.expect_find_by_login()
            .returning(|_| Ok(Some(stored_user(Uuid::now_v7(), "secret1"))));
        mock.expect_record_login().times(1).returning(|_| Ok(()));

        let service = UserService::new(mock);
        let request = LoginRequest {
            email: Some("COORD@shop.com".into()),
            password: Some("secret1".into()),
            ..Default::default()
        };
        let user = service.login(&request).await.unwrap();
        assert!(user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_change_password_rules() {
        let id = Uuid::now_v7();

        let mut mock = MockUserRepository::new();
        mock.expect_find_by_id()
            .returning(|id| Ok(Some(stored_user(id, "secret1"))));
        mock.expect_update_password()
            .withf(|_, hash| hash.starts_with("$argon2id$"))
            .times(1)
            .returning(|_, _| Ok(()));

        let service = UserService::new(mock);

        let missing = ChangePasswordRequest {
            current_password: Some("secret1".into()),
            new_password: None,
        };
        assert!(matches!(
            service.change_password(id, missing).await,
            Err(UserError::Validation(_))
        ));

        let short = ChangePasswordRequest {
            current_password: Some("secret1".into()),
            new_password: Some("abc".into()),
        };
        assert!(matches!(
            service.change_password(id, short).await,
            Err(UserError::Validation(_))
        ));

        let wrong = ChangePasswordRequest {
            current_password: Some("bad-guess".into()),
            new_password: Some("another1".into()),
        };
        assert!(matches!(
            service.change_password(id, wrong).await,
            Err(UserError::WrongPassword)
        ));

        let ok = ChangePasswordRequest {
            current_password: Some("secret1".into()),
            new_password: Some("another1".into()),
        };
        assert!(service.change_password(id, ok).await.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_principal_rejects_inactive() {
        let mut mock = MockUserRepository::new();
        mock.expect_find_by_id().returning(|id| {
            let mut user = stored_user(id, "secret1");
            user.is_active = false;
            Ok(Some(user))
        });

        let service = UserService::new(mock);
        let result = service.resolve_principal(Uuid::now_v7()).await;
        assert!(matches!(result, Err(UserError::Inactive)));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_only_once() {
        let bootstrap = AdminBootstrap {
            email: "root@shop.com".into(),
            username: "root".into(),
            password: "change-me".into(),
            phone: "+10000000000".into(),
        };

        let mut existing = MockUserRepository::new();
        existing.expect_admin_exists().returning(|| Ok(true));
        existing.expect_create().never();
        let service = UserService::new(existing);
        assert!(service.bootstrap_admin(bootstrap.clone()).await.unwrap().is_none());

        let mut empty = MockUserRepository::new();
        empty.expect_admin_exists().returning(|| Ok(false));
        empty
            .expect_create()
            .withf(|user| user.role == Role::Admin && user.created_by.is_none())
            .returning(Ok);
        let service = UserService::new(empty);
        let created = service.bootstrap_admin(bootstrap).await.unwrap().unwrap();
        assert_eq!(created.username, "root");
    }
}
