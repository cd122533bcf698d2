use super::config::JwtConfig;
use crate::errors::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by every access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// User id
    pub sub: String,
    pub username: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl JwtClaims {
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Invalid("subject is not a user id".into()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::TokenExpired,
            TokenError::Invalid(reason) => {
                tracing::debug!(%reason, "Rejected token");
                AppError::Unauthorized("Invalid access token".to_string())
            }
            TokenError::Signing(reason) => AppError::InternalServerError(reason),
        }
    }
}

/// Issues and verifies HS256 tokens
#[derive(Clone)]
pub struct JwtAuth {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expires_in_secs: i64,
}

impl JwtAuth {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            expires_in_secs: config.expires_in_secs,
        }
    }

    pub fn expires_in_secs(&self) -> i64 {
        self.expires_in_secs
    }

    pub fn create_token(&self, user_id: Uuid, username: &str, role: &str) -> Result<String, TokenError> {
        self.create_token_with_ttl(user_id, username, role, self.expires_in_secs)
    }

    fn create_token_with_ttl(
        &self,
        user_id: Uuid,
        username: &str,
        role: &str,
        ttl_secs: i64,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            role: role.to_string(),
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Checks signature and expiry.
    pub fn verify_token(&self, token: &str) -> Result<JwtClaims, TokenError> {
        decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> JwtAuth {
        JwtAuth::new(&JwtConfig::new("test-secret-key-that-is-at-least-32-characters").unwrap())
    }

    #[test]
    fn test_create_and_verify() {
        let auth = auth();
        let user_id = Uuid::now_v7();

        let token = auth.create_token(user_id, "ana", "admin").unwrap();
        let claims = auth.verify_token(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[test]
    fn test_expired_token_is_distinguished() {
        let auth = auth();
        let token = auth
            .create_token_with_ttl(Uuid::now_v7(), "ana", "admin", -120)
            .unwrap();

        assert!(matches!(auth.verify_token(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_foreign_signature_is_invalid() {
        let other = JwtAuth::new(&JwtConfig::new("another-secret-key-that-is-at-least-32-chars").unwrap());
        let token = other.create_token(Uuid::now_v7(), "ana", "admin").unwrap();

        assert!(matches!(auth().verify_token(&token), Err(TokenError::Invalid(_))));
        assert!(matches!(auth().verify_token("garbage"), Err(TokenError::Invalid(_))));
    }
}
