//! Process configuration, read once from the environment at startup.

use std::env;
use std::fmt;

use chrono::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 100;
/// One year.
const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// HMAC signing secret shared by the token issuer and validator.
#[derive(Clone)]
pub struct JwtSecret(String);

impl JwtSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JwtSecret([REDACTED])")
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: JwtSecret,
    pub token_ttl: Duration,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// Username and password seeded into the in-memory store.
    pub dev_user: Option<(String, String)>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_secret", &self.jwt_secret)
            .field("token_ttl", &self.token_ttl)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("database_max_connections", &self.database_max_connections)
            .field("dev_user", &self.dev_user.as_ref().map(|(name, _)| name))
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET")
            .map(JwtSecret::new)
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let port = match get("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: v,
            })?,
            None => DEFAULT_PORT,
        };

        let token_ttl = match get("TOKEN_TTL_MINUTES") {
            Some(v) => match v
                .parse::<i64>()
                .ok()
                .filter(|m| (1..=MAX_TOKEN_TTL_MINUTES).contains(m))
                .and_then(Duration::try_minutes)
            {
                Some(ttl) => ttl,
                None => {
                    return Err(ConfigError::Invalid {
                        name: "TOKEN_TTL_MINUTES",
                        value: v,
                    })
                }
            },
            None => Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
        };

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(v) => match v.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "DATABASE_MAX_CONNECTIONS",
                        value: v,
                    })
                }
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            jwt_secret,
            token_ttl,
            database_url: get("DATABASE_URL"),
            database_max_connections,
            dev_user: get("DEV_USERNAME").zip(get("DEV_PASSWORD")),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
