// HTTP API error taxonomy
use axum::{http::header, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::resolver::AuthError;
use crate::auth::token::TokenError;
use crate::database::StoreError;

/// Closed set of wire-level errors. Every failure a client can see is one of
/// these kinds, rendered centrally at the pipeline boundary.
#[derive(Debug, Clone)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized (all carry a WWW-Authenticate challenge)
    Unauthorized(String),
    MissingCredentials(String),
    InvalidCredentials(String),

    // 403 Forbidden
    Forbidden(String),
    InactiveUser(String),

    // 404 Not Found
    NotFound(String),
    UserNotFound(String),

    // 409 Conflict
    Conflict(String),
    UsernameTaken(String),
    EmailTaken(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 422 Unprocessable Entity
    ValidationFailed(String),

    // 429 Too Many Requests
    RateLimited(String),

    // 500 Internal Server Error
    CredentialFormat(String),
    Internal(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_)
            | ApiError::MissingCredentials(_)
            | ApiError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) | ApiError::InactiveUser(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::UserNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::UsernameTaken(_) | ApiError::EmailTaken(_) => {
                StatusCode::CONFLICT
            }
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::CredentialFormat(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code clients can branch on, independent of the
    /// human-readable detail text.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::MissingCredentials(_) => "MISSING_CREDENTIALS",
            ApiError::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::InactiveUser(_) => "INACTIVE_USER",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::UserNotFound(_) => "USER_NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::UsernameTaken(_) => "USERNAME_EXISTS",
            ApiError::EmailTaken(_) => "EMAIL_EXISTS",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::ValidationFailed(_) => "VALIDATION_ERROR",
            ApiError::RateLimited(_) => "RATE_LIMITED",
            ApiError::CredentialFormat(_) => "CREDENTIAL_FORMAT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get client-safe detail message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::MissingCredentials(msg)
            | ApiError::InvalidCredentials(msg)
            | ApiError::Forbidden(msg)
            | ApiError::InactiveUser(msg)
            | ApiError::NotFound(msg)
            | ApiError::UserNotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::UsernameTaken(msg)
            | ApiError::EmailTaken(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::ValidationFailed(msg)
            | ApiError::RateLimited(msg)
            | ApiError::CredentialFormat(msg)
            | ApiError::Internal(msg) => msg,
        }
    }

    /// 401 responses challenge the client for a bearer credential.
    pub fn challenge(&self) -> Option<&'static str> {
        match self {
            ApiError::Unauthorized(_)
            | ApiError::MissingCredentials(_)
            | ApiError::InvalidCredentials(_) => Some("Bearer"),
            _ => None,
        }
    }

    /// Body rendered when the response never reaches the boundary responder
    /// (the responder rewrites this with path, method and timestamp).
    pub fn to_json(&self) -> Value {
        json!({
            "detail": self.message(),
            "code": self.error_code(),
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn missing_credentials(message: impl Into<String>) -> Self {
        ApiError::MissingCredentials(message.into())
    }

    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        ApiError::InvalidCredentials(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn inactive_user(message: impl Into<String>) -> Self {
        ApiError::InactiveUser(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn user_not_found(message: impl Into<String>) -> Self {
        ApiError::UserNotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::PayloadTooLarge(message.into())
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        ApiError::ValidationFailed(message.into())
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        ApiError::RateLimited(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

// Convert lower-level error types to ApiError
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential => {
                ApiError::MissingCredentials("Not authenticated".to_string())
            }
            AuthError::CredentialInvalid(token_err) => {
                tracing::debug!("token rejected: {}", token_err);
                ApiError::InvalidCredentials("Invalid or expired token".to_string())
            }
            AuthError::PrincipalNotFound => ApiError::UserNotFound("User not found".to_string()),
            AuthError::PrincipalInactive => ApiError::InactiveUser("Inactive user".to_string()),
            AuthError::Backend(store_err) => store_err.into(),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid(_) | TokenError::Expired | TokenError::MissingClaim(_) => {
                tracing::debug!("token rejected: {}", err);
                ApiError::InvalidCredentials("Invalid or expired token".to_string())
            }
            TokenError::Generation(msg) => {
                tracing::error!("JWT generation failed: {}", msg);
                ApiError::Internal("Failed to issue access token".to_string())
            }
            TokenError::InvalidSecret | TokenError::UnsupportedAlgorithm(_) => {
                tracing::error!("token service misconfigured: {}", err);
                ApiError::Internal("Authentication service unavailable".to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername => {
                ApiError::UsernameTaken("Username already exists".to_string())
            }
            StoreError::DuplicateEmail => ApiError::EmailTaken("Email already exists".to_string()),
            StoreError::Sqlx(sqlx_err) => {
                // Log the real error but return a generic message
                tracing::error!("database error: {}", sqlx_err);
                ApiError::Internal("An error occurred while processing your request".to_string())
            }
        }
    }
}

impl From<crate::auth::password::PasswordError> for ApiError {
    fn from(err: crate::auth::password::PasswordError) -> Self {
        match err {
            crate::auth::password::PasswordError::InvalidHash(msg) => {
                tracing::error!("stored credential hash is unreadable: {}", msg);
                ApiError::CredentialFormat("Stored credential is unreadable".to_string())
            }
            crate::auth::password::PasswordError::Hashing(msg) => {
                tracing::error!("password hashing failed: {}", msg);
                ApiError::Internal("An error occurred while processing your request".to_string())
            }
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

// Automatic HTTP response conversion for Axum. The error itself rides along
// in the response extensions so the boundary responder can re-shape the body
// with request context and log it.
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let mut response = (status, Json(self.to_json())).into_response();
        if let Some(challenge) = self.challenge() {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static(challenge),
            );
        }
        response.extensions_mut().insert(self);
        response
    }
}
