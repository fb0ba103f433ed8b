/// Error Handling Module
///
/// Every component of the credential subsystem returns its own typed error so
/// callers (and tests) can tell failure causes apart. At the HTTP boundary all
/// of them collapse into `AppError`, which renders a uniform JSON body and
/// never reveals which internal check failed.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

/// ============================================================================
/// 1. COMPONENT ERROR TYPES
/// ============================================================================

/// Credential verifier errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(#[source] bcrypt::BcryptError),

    /// Wrong password or unreadable stored hash; the two are not distinguished.
    #[error("password does not match")]
    Mismatch,
}

/// Access token validation and issuance errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessTokenError {
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("malformed token")]
    Malformed,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Authorization header parsing errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BearerError {
    #[error("missing authorization header")]
    MissingAuthorization,

    #[error("authorization header is not of the form `Bearer <token>`")]
    MalformedScheme,
}

/// Persistence collaborator errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("duplicate entry: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Backend(#[source] sqlx::Error),
}

/// Refresh token lifecycle errors
#[derive(Debug, Error)]
pub enum RefreshTokenError {
    #[error("refresh token not found")]
    NotFound,

    #[error("refresh token has expired")]
    Expired,

    #[error("refresh token has been revoked")]
    Revoked,

    #[error("failed to generate refresh token: {0}")]
    Generation(#[source] rand::Error),

    #[error(transparent)]
    Store(StoreError),
}

impl RefreshTokenError {
    /// Short tag for the `reason` log field
    pub fn reason(&self) -> &'static str {
        match self {
            RefreshTokenError::NotFound => "not_found",
            RefreshTokenError::Expired => "expired",
            RefreshTokenError::Revoked => "revoked",
            RefreshTokenError::Generation(_) => "generation",
            RefreshTokenError::Store(_) => "store",
        }
    }
}

impl From<StoreError> for RefreshTokenError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => RefreshTokenError::NotFound,
            other => RefreshTokenError::Store(other),
        }
    }
}

/// ============================================================================
/// 2. SESSION ERRORS (what the orchestrator exposes)
/// ============================================================================

/// Outcome kinds of the session use cases.
///
/// `InvalidCredentials` and `Unauthorized` intentionally carry no cause; the
/// cause is logged where it is detected.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthorized")]
    Unauthorized,

    #[error("email already registered")]
    Conflict,

    #[error("credential processing failed: {0}")]
    CredentialFailure(#[source] PasswordError),

    #[error("token issuance failed: {0}")]
    TokenIssuance(String),

    #[error("persistence failure: {0}")]
    Persistence(#[source] StoreError),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => SessionError::Conflict,
            other => SessionError::Persistence(other),
        }
    }
}

/// ============================================================================
/// 3. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type every HTTP handler returns
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("forbidden")]
    Forbidden,
}

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID, also present in the server log line
    pub error_id: String,
    pub message: String,
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Session(e) => match e {
                SessionError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    "Incorrect email or password".to_string(),
                ),
                SessionError::Unauthorized => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "Unauthorized".to_string(),
                ),
                SessionError::Conflict => (
                    StatusCode::CONFLICT,
                    "DUPLICATE_ENTRY",
                    "Email already registered".to_string(),
                ),
                SessionError::CredentialFailure(_) | SessionError::TokenIssuance(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                ),
                SessionError::Persistence(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                ),
            },
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", "Forbidden".to_string()),
        }
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = self.parts();
        let body = ErrorResponse::new(
            request_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );
        (status, body)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Session(SessionError::InvalidCredentials)
            | AppError::Session(SessionError::Unauthorized) => {
                tracing::warn!(request_id = request_id, error = %self, "Authentication failed");
            }
            AppError::Session(SessionError::Conflict) => {
                tracing::warn!(request_id = request_id, error = %self, "Duplicate entry attempt");
            }
            AppError::Session(e) => {
                tracing::error!(request_id = request_id, error = %e, "Request failed");
            }
            AppError::BadRequest(msg) => {
                tracing::warn!(request_id = request_id, error = %msg, "Bad request");
            }
            AppError::Forbidden => {
                tracing::warn!(request_id = request_id, "Forbidden");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, body) = <Self as ErrorHandler>::error_response(self, &request_id);
        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}
