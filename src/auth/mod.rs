use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::remote::{Credentials, ErrorCategory, RemoteConnector, RemoteError};

/// Signed session payload. The remote password travels inside the token and
/// is stored nowhere else; `Debug` redacts it.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    pub iss: String,
    pub host: String,
    pub user: String,
    pub password: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.host, &self.user, &self.password)
    }
}

impl fmt::Debug for SessionClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClaims")
            .field("sub", &self.sub)
            .field("iss", &self.iss)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    #[error("Token generation failed: {0}")]
    Generation(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Encodes and verifies session tokens with the server-held secret.
pub struct SessionSigner {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    lifetime_secs: i64,
}

impl SessionSigner {
    pub fn new(security: &SecurityConfig) -> Self {
        Self::from_parts(
            security.jwt_secret.as_bytes(),
            security.jwt_algorithm,
            &security.jwt_issuer,
            security.token_lifetime_secs(),
        )
    }

    pub fn from_parts(secret: &[u8], algorithm: Algorithm, issuer: &str, lifetime_secs: i64) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.to_string(),
            lifetime_secs,
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    pub fn sign(&self, credentials: &Credentials, subject: &str) -> Result<IssuedToken, TokenError> {
        self.sign_at(credentials, subject, Utc::now().timestamp())
    }

    pub fn sign_at(&self, credentials: &Credentials, subject: &str, now: i64) -> Result<IssuedToken, TokenError> {
        let claims = SessionClaims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            host: credentials.host.clone(),
            user: credentials.user.clone(),
            password: credentials.password.clone(),
            iat: now,
            exp: now + self.lifetime_secs,
        };

        let access_token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))?;

        Ok(IssuedToken {
            access_token,
            token_type: "bearer",
            expires_in: self.lifetime_secs,
        })
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Check signature, algorithm, issuer and claim shape, then expiry
    /// against `now`. A token is dead from the second `exp` is reached.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["sub", "iss", "exp"]);
        validation.set_issuer(&[self.issuer.as_str()]);

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::TokenExpired,
            _ => TokenError::TokenInvalid(e.to_string()),
        })?;

        if now >= data.claims.exp {
            return Err(TokenError::TokenExpired);
        }
        Ok(data.claims)
    }
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Missing credentials or host")]
    MissingFields,

    #[error("Could not reach remote host: {0}")]
    Unreachable(RemoteError),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(RemoteError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Verify the credentials with a live probe against the host, then sign a
/// token embedding them. Nothing is issued for unverified credentials.
pub async fn issue_session(
    connector: &RemoteConnector,
    signer: &SessionSigner,
    host: &str,
    user: &str,
    password: &str,
) -> Result<IssuedToken, LoginError> {
    let credentials = Credentials::new(host.trim(), user.trim(), password.trim());
    if credentials.host.is_empty() || credentials.user.is_empty() || credentials.password.is_empty() {
        return Err(LoginError::MissingFields);
    }

    if let Err(e) = connector.probe(&credentials).await {
        tracing::warn!("Login probe failed for {}@{}: {}", credentials.user, credentials.host, e);
        return Err(match e.classify().category {
            ErrorCategory::ConnectionUnreachable => LoginError::Unreachable(e),
            _ => LoginError::InvalidCredentials(e),
        });
    }

    let token = signer.sign(&credentials, &credentials.user)?;
    tracing::info!("Issued session for {}@{}", credentials.user, credentials.host);
    Ok(token)
}
