// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::{LoginError, TokenError};
use crate::catalog::{CatalogError, IdentifierError};
use crate::remote::{ErrorCategory, RemoteError};
use crate::render::RenderError;
use crate::webhook::WebhookError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (external service issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),

    // 500 or 502, classified remote driver failure
    Remote {
        status: u16,
        category: ErrorCategory,
        message: String,
    },
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::Remote { status, .. } => *status,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
            ApiError::Remote { message, .. } => message,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::Remote { category, .. } => match category {
                ErrorCategory::ObjectNotFound => "OBJECT_NOT_FOUND",
                ErrorCategory::PermissionDenied => "PERMISSION_DENIED",
                ErrorCategory::ConnectionUnreachable => "CONNECTION_UNREACHABLE",
                ErrorCategory::Unclassified => "REMOTE_ERROR",
            },
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }

    /// Classify a remote failure. Unreachable hosts are a gateway problem (502),
    /// everything else the host reported is a 500 prefixed with `context`.
    pub fn remote(context: &str, err: &RemoteError) -> Self {
        let classified = err.classify();
        let status = match classified.category {
            ErrorCategory::ConnectionUnreachable => 502,
            _ => 500,
        };
        ApiError::Remote {
            status,
            category: classified.category,
            message: format!("{}: {}", context, classified.message),
        }
    }
}

// Convert other error types to ApiError
impl From<IdentifierError> for ApiError {
    fn from(err: IdentifierError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::TokenExpired => ApiError::unauthorized("Token expired"),
            TokenError::TokenInvalid(msg) => ApiError::unauthorized(format!("Invalid token: {}", msg)),
            TokenError::Generation(msg) => {
                tracing::error!("Token generation failed: {}", msg);
                ApiError::internal_server_error("Failed to issue session token")
            }
        }
    }
}

impl From<LoginError> for ApiError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::MissingFields => ApiError::bad_request("Missing credentials or host"),
            LoginError::Unreachable(e) => ApiError::remote("Error connecting to IBM i", &e),
            LoginError::InvalidCredentials(e) => {
                ApiError::unauthorized(format!("Invalid credentials: {}", e.classify().message))
            }
            LoginError::Token(e) => e.into(),
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::UnsupportedFormat(format) => ApiError::bad_request(format!("Unsupported format: {}", format)),
            other => {
                tracing::error!("Export rendering failed: {}", other);
                ApiError::internal_server_error(format!("Failed to render export: {}", other))
            }
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::NotConfigured => ApiError::internal_server_error("N8N_WEBHOOK_URL is not configured"),
            WebhookError::Request(e) => ApiError::bad_gateway(format!("Webhook request failed: {}", e)),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
