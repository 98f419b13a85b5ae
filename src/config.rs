//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `AUTH_SECRET` - HS256 signing secret shared with the session issuer (min 32 chars)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8083)
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `SESSION_COOKIE_NAME` - Cookie carrying the session JWT (default: session-token)
//! - `TOKEN_TTL_HOURS` - Lifetime of issued bearer tokens (default: 24)
//! - `DATA_DELETION_STATUS_URL` - Status page linked from data-deletion callbacks

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_AUTH_SECRET_LENGTH: usize = 32;
const DEFAULT_DATA_DELETION_STATUS_URL: &str = "http://localhost:8083/data-deletion/status";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Contains the database password.
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    pub database_max_connections: u32,
    pub auth_secret: SecretString,
    pub session_cookie_name: String,
    pub token_ttl_hours: i64,
    pub data_deletion_status_url: String,
}

impl AppConfig {
    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = SecretString::from(get_required_env("DATABASE_URL")?);
        let auth_secret = SecretString::from(get_required_env("AUTH_SECRET")?);
        validate_auth_secret(&auth_secret, "AUTH_SECRET")?;

        Ok(Self {
            database_url,
            host: parse_env_or_default("HOST", "0.0.0.0")?,
            port: parse_env_or_default("PORT", "8083")?,
            database_max_connections: parse_env_or_default("DATABASE_MAX_CONNECTIONS", "10")?,
            auth_secret,
            session_cookie_name: get_env_or_default("SESSION_COOKIE_NAME", "session-token"),
            token_ttl_hours: parse_env_or_default("TOKEN_TTL_HOURS", "24")?,
            data_deletion_status_url: get_env_or_default("DATA_DELETION_STATUS_URL", DEFAULT_DATA_DELETION_STATUS_URL),
        })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn validate_auth_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let len = secret.expose_secret().len();
    if len < MIN_AUTH_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_AUTH_SECRET_LENGTH} characters, got {len}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_secret_rejected() {
        let err = validate_auth_secret(&SecretString::from("short"), "AUTH_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(name, _) if name == "AUTH_SECRET"));
        assert!(validate_auth_secret(&SecretString::from("x".repeat(32)), "AUTH_SECRET").is_ok());
    }

    #[test]
    fn test_parse_default_applies() {
        let port: u16 = parse_env_or_default("SHOPGRAM_TEST_UNSET_PORT", "8083").unwrap();
        assert_eq!(port, 8083);
        let err = parse_env_or_default::<u16>("SHOPGRAM_TEST_UNSET_PORT", "not-a-port").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(..)));
    }
}
