use axum_helpers::extractors::trim;
use chrono::{DateTime, Utc};
use database::mongodb::uuid_string;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").unwrap()
});

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9][\d\s\-()]{0,20}$").unwrap());

fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::new("email").with_message("Please enter a valid email".into()))
    }
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE.is_match(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("phone").with_message("Please enter a valid phone number".into()))
    }
}

/// Access level of a back-office account
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    Admin,
    #[default]
    Coordinador,
}

/// Stored user document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id", with = "uuid_string")]
    pub id: Uuid,
    pub username: String,
    /// Lower-cased on write
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub phone: String,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, with = "uuid_string::option")]
    pub created_by: Option<Uuid>,
    #[serde(default, with = "uuid_string::option")]
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl User {
    /// New active account; the caller supplies an already-hashed password.
    pub fn new(input: CreateUser, password_hash: String, created_by: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            username: input.username,
            email: input.email.to_lowercase(),
            password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
            role: input.role.unwrap_or_default(),
            is_active: input.is_active.unwrap_or(true),
            phone: input.phone,
            last_login: None,
            created_by,
            updated_by: created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn apply_update(&mut self, update: UpdateUser, updated_by: Uuid) {
        if let Some(username) = update.username {
            self.username = username;
        }
        if let Some(email) = update.email {
            self.email = email.to_lowercase();
        }
        if let Some(first_name) = update.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            self.last_name = last_name;
        }
        if let Some(phone) = update.phone {
            self.phone = phone;
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_by = Some(updated_by);
        self.updated_at = Utc::now();
    }
}

/// API view of a user; the password hash never leaves the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// `"<firstName> <lastName>"`
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub phone: String,
    pub last_login: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            full_name: user.full_name(),
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            is_active: user.is_active,
            phone: user.phone,
            last_login: user.last_login,
            created_by: user.created_by,
            updated_by: user.updated_by,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    #[serde(deserialize_with = "trim::string")]
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,
    #[serde(deserialize_with = "trim::string")]
    #[validate(custom(function = "validate_email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(deserialize_with = "trim::string")]
    #[validate(length(min = 1, max = 50, message = "First name is required and cannot exceed 50 characters"))]
    pub first_name: String,
    #[serde(deserialize_with = "trim::string")]
    #[validate(length(min = 1, max = 50, message = "Last name is required and cannot exceed 50 characters"))]
    pub last_name: String,
    #[serde(deserialize_with = "trim::string")]
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(custom(function = "validate_email"))]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(max = 50, message = "First name cannot exceed 50 characters"))]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(length(max = 50, message = "Last name cannot exceed 50 characters"))]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "trim::option")]
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    /// Rejected: passwords change through `/auth/change-password`
    #[schema(ignore)]
    pub password: Option<String>,
}

impl UpdateUser {
    /// Whether the update touches fields reserved for administrators
    pub fn touches_privileged_fields(&self) -> bool {
        self.role.is_some() || self.is_active.is_some()
    }
}

/// Query string of `GET /users`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    /// Case-insensitive match on username, email, first and last name
    pub search: Option<String>,
}

/// Presence is checked by [`LoginRequest::credentials`], not by validator rules
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Either `email` or `username` identifies the account
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// `(login, password)` when both are present and non-blank
    pub fn credentials(&self) -> Option<(String, &str)> {
        let login = self
            .email
            .as_deref()
            .or(self.username.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some((login.to_string(), password))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: u64,
    pub active_users: u64,
    pub inactive_users: u64,
    pub admins: u64,
    pub coordinators: u64,
}
