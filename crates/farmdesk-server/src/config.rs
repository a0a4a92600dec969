//! Server configuration loaded from the environment.

use std::net::SocketAddr;

use farmdesk_auth::AuthConfig;
use farmdesk_db::DbConfig;
use farmdesk_mail::MailConfig;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for environment variable {var}: {reason}")]
    InvalidEnvValue { var: String, reason: String },
}

/// Everything the binary needs to start serving.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub db: DbConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    /// Add `Secure` to the session cookie.
    pub secure_cookies: bool,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(name: &str) -> Result<String, ConfigError> {
    var(name).ok_or_else(|| ConfigError::MissingEnvVar(name.into()))
}

fn parsed<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidEnvValue {
            var: name.into(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// A PEM key given either inline or as a path to a file.
fn pem(name: &str) -> Result<String, ConfigError> {
    let value = required(name)?;
    if value.contains("-----BEGIN") {
        return Ok(value.replace("\\n", "\n"));
    }
    std::fs::read_to_string(&value).map_err(|e| ConfigError::InvalidEnvValue {
        var: name.into(),
        reason: format!("cannot read {value}: {e}"),
    })
}

impl ServerConfig {
    /// Read configuration from `FARMDESK_*` environment variables.
    ///
    /// Only the JWT key pair is required; everything else has a default
    /// suitable for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        let auth_defaults = AuthConfig::default();
        let db_defaults = DbConfig::default();

        let auth = AuthConfig {
            jwt_private_key_pem: pem("FARMDESK_JWT_PRIVATE_KEY")?,
            jwt_public_key_pem: pem("FARMDESK_JWT_PUBLIC_KEY")?,
            jwt_issuer: var("FARMDESK_JWT_ISSUER").unwrap_or(auth_defaults.jwt_issuer),
            access_token_lifetime_secs: parsed(
                "FARMDESK_ACCESS_TOKEN_TTL_SECS",
                auth_defaults.access_token_lifetime_secs,
            )?,
            session_lifetime_secs: parsed(
                "FARMDESK_SESSION_TTL_SECS",
                auth_defaults.session_lifetime_secs,
            )?,
            pepper: var("FARMDESK_PASSWORD_PEPPER"),
            public_base_url: var("FARMDESK_PUBLIC_URL").unwrap_or(auth_defaults.public_base_url),
            ..auth_defaults
        };

        let db = DbConfig {
            url: var("FARMDESK_DB_URL").unwrap_or(db_defaults.url),
            namespace: var("FARMDESK_DB_NAMESPACE").unwrap_or(db_defaults.namespace),
            database: var("FARMDESK_DB_NAME").unwrap_or(db_defaults.database),
            username: var("FARMDESK_DB_USER"),
            password: var("FARMDESK_DB_PASSWORD"),
        };

        Ok(Self {
            bind_addr: parsed("FARMDESK_BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            db,
            auth,
            mail: MailConfig::from_env(),
            secure_cookies: parsed("FARMDESK_SECURE_COOKIES", true)?,
        })
    }
}
