// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::database::models::Role;

/// Single message used for every credential failure so that an unknown
/// email and a wrong password are indistinguishable to the caller.
pub const INVALID_CREDENTIALS_MSG: &str = "Invalid email or password";

/// HTTP API error with appropriate status codes and client-friendly messages.
///
/// Every auth operation returns `Result<T, ApiError>`; this is the one place
/// where failures are mapped to an HTTP status and JSON body.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    Validation(String),

    // 401 Unauthorized
    InvalidCredentials,
    NoToken,
    InvalidToken,
    ExpiredToken,
    RevokedToken,
    UnknownUser,
    InactiveUser,

    // 403 Forbidden
    InsufficientPermissions { required: Vec<Role>, actual: Role },

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 423 Locked
    Locked { locked_until: DateTime<Utc> },

    // 429 Too Many Requests
    TooManyRequests { retry_after_secs: u64 },

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials
            | ApiError::NoToken
            | ApiError::InvalidToken
            | ApiError::ExpiredToken
            | ApiError::RevokedToken
            | ApiError::UnknownUser
            | ApiError::InactiveUser => StatusCode::UNAUTHORIZED,
            ApiError::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Locked { .. } => StatusCode::LOCKED,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for client handling. `TOKEN_EXPIRED` is the only code
    /// on which clients should attempt a refresh-and-retry; every other 401
    /// code means re-login.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::NoToken => "NO_TOKEN",
            ApiError::InvalidToken => "INVALID_TOKEN",
            ApiError::ExpiredToken => "TOKEN_EXPIRED",
            ApiError::RevokedToken => "TOKEN_REVOKED",
            ApiError::UnknownUser => "USER_NOT_FOUND",
            ApiError::InactiveUser => "USER_INACTIVE",
            ApiError::InsufficientPermissions { .. } => "INSUFFICIENT_PERMISSIONS",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Locked { .. } => "ACCOUNT_LOCKED",
            ApiError::TooManyRequests { .. } => "RATE_LIMIT_EXCEEDED",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) | ApiError::Validation(msg) => msg.clone(),
            ApiError::InvalidCredentials => INVALID_CREDENTIALS_MSG.to_string(),
            ApiError::NoToken => "Access token required".to_string(),
            ApiError::InvalidToken => "Invalid access token".to_string(),
            ApiError::ExpiredToken => "Access token expired".to_string(),
            ApiError::RevokedToken => "Token has been revoked".to_string(),
            ApiError::UnknownUser => "User not found".to_string(),
            ApiError::InactiveUser => "User is inactive".to_string(),
            ApiError::InsufficientPermissions { .. } => {
                "You do not have permission to access this resource".to_string()
            }
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::Conflict(msg) => msg.clone(),
            ApiError::Locked { .. } => {
                "Account temporarily locked after too many failed login attempts".to_string()
            }
            ApiError::TooManyRequests { .. } => "Too many requests, try again later".to_string(),
            ApiError::InternalServerError(msg) => {
                // Internal detail only leaves the process in development mode
                if crate::config::config().environment == crate::config::Environment::Development {
                    msg.clone()
                } else {
                    "An internal error occurred".to_string()
                }
            }
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code(),
        });

        match self {
            ApiError::Locked { locked_until } => {
                body["locked_until"] = json!(locked_until);
            }
            ApiError::InsufficientPermissions { required, actual } => {
                body["required_roles"] = json!(required);
                body["user_role"] = json!(actual);
            }
            ApiError::TooManyRequests { retry_after_secs } => {
                body["retry_after"] = json!(retry_after_secs);
            }
            _ => {}
        }

        body
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

// Convert low-level error types to ApiError. The store and token layers keep
// their own typed errors; nothing below this boundary reaches an HTTP body.
impl From<crate::database::store::StoreError> for ApiError {
    fn from(err: crate::database::store::StoreError) -> Self {
        match err {
            // A unique index caught a racing insert after the pre-checks
            crate::database::store::StoreError::Duplicate(field) => {
                ApiError::conflict(format!("An account with that {} already exists", field))
            }
            other => {
                tracing::error!("Credential store error: {}", other);
                ApiError::internal("An error occurred while processing your request")
            }
        }
    }
}

impl From<crate::auth::tokens::TokenError> for ApiError {
    fn from(err: crate::auth::tokens::TokenError) -> Self {
        match err {
            crate::auth::tokens::TokenError::Expired => ApiError::ExpiredToken,
            crate::auth::tokens::TokenError::Invalid => ApiError::InvalidToken,
            crate::auth::tokens::TokenError::Generation(msg) => {
                tracing::error!("Token generation error: {}", msg);
                ApiError::internal("Failed to issue token")
            }
        }
    }
}

impl From<crate::auth::password::PasswordError> for ApiError {
    fn from(err: crate::auth::password::PasswordError) -> Self {
        tracing::error!("Password hashing error: {}", err);
        ApiError::internal("An error occurred while processing your request")
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
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
