//! Admin authentication: bcrypt-checked credentials exchanged for an HS256
//! bearer token.

mod middleware;

use std::collections::HashMap;

use bcrypt::{hash, verify, DEFAULT_COST};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;

pub use middleware::{optional_admin, require_admin, AdminIdentity};

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Admin username.
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("No token provided")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientRole,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("token signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

pub struct AdminAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// username -> bcrypt hash
    admins: HashMap<String, String>,
    token_ttl_secs: i64,
    hash_cost: u32,
}

impl AdminAuth {
    pub fn new(secret: &str, token_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            admins: HashMap::new(),
            token_ttl_secs,
            hash_cost: DEFAULT_COST,
        }
    }

    /// Lower bcrypt cost, for tests.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let mut auth = Self::new(&config.jwt_secret, config.token_ttl_secs);
        for (username, password) in &config.admin_users {
            auth.add_admin(username, password)?;
        }
        tracing::info!("Auth: loaded {} admin user(s)", auth.admins.len());
        Ok(auth)
    }

    pub fn add_admin(&mut self, username: &str, password: &str) -> Result<(), AuthError> {
        let password_hash =
            hash(password, self.hash_cost).map_err(|e| AuthError::Hash(e.to_string()))?;
        self.admins.insert(username.to_string(), password_hash);
        Ok(())
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let password_hash = self
            .admins
            .get(username)
            .ok_or(AuthError::InvalidCredentials)?;

        if verify(password, password_hash).unwrap_or(false) {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    pub fn issue_token(&self, username: &str) -> Result<IssuedToken, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: username.to_string(),
            role: ADMIN_ROLE.to_string(),
            iat: now,
            exp: now + self.token_ttl_secs,
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            token,
            token_type: "Bearer",
            expires_in: self.token_ttl_secs,
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| AuthError::InvalidToken)?;
        if data.claims.role != ADMIN_ROLE {
            return Err(AuthError::InsufficientRole);
        }
        Ok(data.claims)
    }

    /// Accepts `Bearer <token>`.
    pub fn validate_authorization(&self, header: &str) -> Result<Claims, AuthError> {
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        self.validate_token(token)
    }
}

#[cfg(test)]
pub(crate) fn test_auth() -> AdminAuth {
    let mut auth = AdminAuth::new("test-secret-key-that-is-at-least-32-characters-long", 3600)
        .with_hash_cost(4);
    auth.add_admin("admin", "admin-pass").unwrap();
    auth
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticate() {
        let auth = test_auth();
        assert!(auth.authenticate("admin", "admin-pass").is_ok());
        assert!(matches!(
            auth.authenticate("admin", "wrong"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.authenticate("nobody", "admin-pass"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_issued_token_validates() {
        let auth = test_auth();
        let issued = auth.issue_token("admin").unwrap();
        let claims = auth
            .validate_authorization(&format!("Bearer {}", issued.token))
            .unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.role, ADMIN_ROLE);
    }

    #[test]
    fn test_rejects_foreign_and_missing_tokens() {
        let auth = test_auth();
        let other = AdminAuth::new("another-secret-key-that-is-at-least-32-chars", 3600);
        let foreign = other.issue_token("admin").unwrap();

        assert!(matches!(
            auth.validate_token(&foreign.token),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            auth.validate_authorization("Basic abc"),
            Err(AuthError::MissingToken)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = AdminAuth::new("test-secret-key-that-is-at-least-32-characters-long", -3600);
        let issued = auth.issue_token("admin").unwrap();
        assert!(auth.validate_token(&issued.token).is_err());
    }
}
