use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::catalog::identifier::Identifier;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Remote driver not found at: {0}")]
    DriverNotFound(String),
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid { name, reason: reason.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Process-wide configuration, read once at startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub security: SecurityConfig,
    pub catalog: CatalogConfig,
    pub remote: RemoteConfig,
    pub webhook: WebhookConfig,
}

/// The signing secret protects every password embedded in an issued token,
/// so it is treated as a credential store. `Debug` never prints it.
#[derive(Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub jwt_expiry_minutes: u64,
    pub jwt_issuer: String,
    pub cors_origins: Vec<String>,
}

impl SecurityConfig {
    pub fn token_lifetime_secs(&self) -> i64 {
        (self.jwt_expiry_minutes * 60) as i64
    }
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expiry_minutes", &self.jwt_expiry_minutes)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    /// Schemas catalog queries are restricted to. Empty means unrestricted.
    pub allowed_libraries: Vec<Identifier>,
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// ODBC driver name, or a path to the driver library.
    pub driver: String,
    pub query_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: Option<Url>,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub probe_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let environment = match get("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_algorithm = match get("JWT_ALGO").or_else(|| get("JWT_ALGORITHM")) {
            Some(name) => parse_hmac_algorithm(&name)?,
            None => Algorithm::HS256,
        };

        let jwt_expiry_minutes = match get("JWT_EXPIRE_MIN").or_else(|| get("JWT_EXP_MINUTES")) {
            Some(v) => {
                let minutes: u64 = v
                    .parse()
                    .map_err(|_| ConfigError::invalid("JWT_EXPIRE_MIN", format!("not a number: {}", v)))?;
                if minutes == 0 {
                    return Err(ConfigError::invalid("JWT_EXPIRE_MIN", "must be at least 1"));
                }
                minutes
            }
            None => default_expiry_minutes(environment),
        };

        let jwt_issuer = get("JWT_ISSUER").unwrap_or_else(|| "ibmi-gateway".to_string());

        let cors_origins = match get("SECURITY_CORS_ORIGINS") {
            Some(v) => split_list(&v),
            None => default_cors_origins(environment),
        };

        let allowed_libraries = match get("ALLOW_LIBS") {
            Some(v) => split_list(&v)
                .iter()
                .map(|lib| {
                    Identifier::parse(lib).map_err(|e| ConfigError::invalid("ALLOW_LIBS", e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let driver = get("IBMI_ODBC_DRIVER").ok_or(ConfigError::Missing("IBMI_ODBC_DRIVER"))?;
        if looks_like_path(&driver) && !Path::new(&driver).is_file() {
            return Err(ConfigError::DriverNotFound(driver));
        }

        let query_timeout = get("REMOTE_TIMEOUT_SECS")
            .map(|v| parse_secs("REMOTE_TIMEOUT_SECS", &v))
            .transpose()?;

        let url = get("N8N_WEBHOOK_URL")
            .map(|v| Url::parse(&v).map_err(|e| ConfigError::invalid("N8N_WEBHOOK_URL", e.to_string())))
            .transpose()?;

        let connect_timeout = match get("WEBHOOK_CONNECT_TIMEOUT_SECS") {
            Some(v) => parse_secs("WEBHOOK_CONNECT_TIMEOUT_SECS", &v)?,
            None => Duration::from_secs(5),
        };
        let timeout = match get("WEBHOOK_TIMEOUT_SECS") {
            Some(v) => parse_secs("WEBHOOK_TIMEOUT_SECS", &v)?,
            None => Duration::from_secs(30),
        };

        Ok(Self {
            environment,
            security: SecurityConfig {
                jwt_secret,
                jwt_algorithm,
                jwt_expiry_minutes,
                jwt_issuer,
                cors_origins,
            },
            catalog: CatalogConfig { allowed_libraries },
            remote: RemoteConfig { driver, query_timeout },
            webhook: WebhookConfig {
                url,
                connect_timeout,
                timeout,
                probe_timeout: Duration::from_secs(5),
            },
        })
    }
}

fn default_expiry_minutes(environment: Environment) -> u64 {
    match environment {
        Environment::Development => 60,
        Environment::Staging => 15,
        Environment::Production => 5,
    }
}

fn default_cors_origins(environment: Environment) -> Vec<String> {
    match environment {
        Environment::Development => vec![
            "http://localhost:5173".to_string(),
            "http://127.0.0.1:5173".to_string(),
        ],
        Environment::Staging | Environment::Production => Vec::new(),
    }
}

/// Only the shared-secret family is accepted; the secret is an HMAC key.
fn parse_hmac_algorithm(name: &str) -> Result<Algorithm, ConfigError> {
    let algorithm = Algorithm::from_str(&name.to_uppercase())
        .map_err(|_| ConfigError::invalid("JWT_ALGO", format!("unknown algorithm: {}", name)))?;
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        other => Err(ConfigError::invalid(
            "JWT_ALGO",
            format!("{:?} needs a key pair; only HS256, HS384 and HS512 are supported", other),
        )),
    }
}

fn parse_secs(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::invalid(name, format!("expected positive seconds, got {}", value))),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn looks_like_path(driver: &str) -> bool {
    driver.contains('/') || driver.contains('\\')
}
