use std::env;

use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
const DEFAULT_SMTP_PORT: u16 = 587;
const MIN_SECRET_LEN: usize = 32;
const DEV_JWT_SECRET: &str = "development-only-secret-change-me-before-deploying";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}'")]
    InvalidValue { var: &'static str, value: String },

    #[error("JWT_SECRET must be set in production")]
    MissingSecret,

    #[error("JWT_SECRET must be at least 32 characters")]
    WeakSecret,

    #[error("ADMIN_USERS must be set in production")]
    MissingAdmins,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Comma-separated; see `cors::create_cors_layer`.
    pub cors_allowed_origins: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `None` runs the service on the in-memory store.
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    /// `(username, password)` pairs; hashed at startup.
    pub admin_users: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub production: bool,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub mail: Option<MailConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let production = var("RUST_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let server = ServerConfig {
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
            cors_allowed_origins: var("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
        };

        let database = DatabaseConfig {
            url: var("DATABASE_URL"),
            max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                var("DATABASE_MAX_CONNECTIONS"),
                DEFAULT_MAX_CONNECTIONS,
            )?,
        };

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) if secret.len() < MIN_SECRET_LEN => return Err(ConfigError::WeakSecret),
            Some(secret) => secret,
            None if production => return Err(ConfigError::MissingSecret),
            None => {
                tracing::warn!("Auth: JWT_SECRET not set, using development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let mut admin_users = var("ADMIN_USERS")
            .map(|raw| parse_admin_users(&raw))
            .unwrap_or_default();
        if admin_users.is_empty() {
            if production {
                return Err(ConfigError::MissingAdmins);
            }
            tracing::warn!("Auth: no ADMIN_USERS configured, adding default admin:admin");
            admin_users.push(("admin".to_string(), "admin".to_string()));
        }

        let auth = AuthConfig {
            jwt_secret,
            token_ttl_secs: parse_or(
                "ADMIN_TOKEN_TTL_SECS",
                var("ADMIN_TOKEN_TTL_SECS"),
                DEFAULT_TOKEN_TTL_SECS,
            )?,
            admin_users,
        };

        let mail = match var("SMTP_HOST") {
            Some(smtp_host) => {
                let username = var("SMTP_USERNAME").unwrap_or_default();
                Some(MailConfig {
                    smtp_host,
                    smtp_port: parse_or("SMTP_PORT", var("SMTP_PORT"), DEFAULT_SMTP_PORT)?,
                    from_email: var("MAIL_FROM").unwrap_or_else(|| username.clone()),
                    username,
                    password: var("SMTP_PASSWORD").unwrap_or_default(),
                    from_name: var("MAIL_FROM_NAME").unwrap_or_else(|| "Event Desk".to_string()),
                })
            }
            None => None,
        };

        Ok(Self {
            production,
            server,
            database,
            auth,
            mail,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var: name, value }),
        None => Ok(default),
    }
}

/// Parses `alice:secret,bob:hunter2`. Entries without a password are skipped.
fn parse_admin_users(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|entry| {
            let (user, password) = entry.trim().split_once(':')?;
            if user.is_empty() || password.is_empty() {
                tracing::warn!("Auth: ignoring malformed ADMIN_USERS entry");
                return None;
            }
            Some((user.to_string(), password.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_for_development() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.database.url.is_none());
        assert!(config.mail.is_none());
        assert_eq!(config.auth.admin_users, vec![("admin".into(), "admin".into())]);
        assert_eq!(config.auth.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_production_requires_secret_and_admins() {
        let err = config_from(&[("RUST_ENV", "production")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret));

        let secret = "s".repeat(MIN_SECRET_LEN);
        let err = config_from(&[("RUST_ENV", "production"), ("JWT_SECRET", &secret)]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingAdmins));
    }

    #[test]
    fn test_rejects_short_secret_and_bad_port() {
        assert!(matches!(
            config_from(&[("JWT_SECRET", "short")]).unwrap_err(),
            ConfigError::WeakSecret
        ));
        assert!(matches!(
            config_from(&[("PORT", "eighty")]).unwrap_err(),
            ConfigError::InvalidValue { var: "PORT", .. }
        ));
    }

    #[test]
    fn test_parse_admin_users_skips_malformed() {
        let users = parse_admin_users("alice:pw1, bob , :x,carol:pw:3");
        assert_eq!(
            users,
            vec![
                ("alice".to_string(), "pw1".to_string()),
                ("carol".to_string(), "pw:3".to_string())
            ]
        );
    }
}
