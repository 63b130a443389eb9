//! Storefront error types with HTTP status code mapping.
//!
//! [`StorefrontError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "message": "insufficient credits",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see [`StorefrontError`] code ranges).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category             | HTTP Status                       |
/// |-----------|----------------------|-----------------------------------|
/// | 1000–1999 | Validation           | 400 Bad Request                   |
/// | 2000–2099 | Not Found            | 404 Not Found                     |
/// | 2100–2199 | Identity             | 401 / 403 / 409                   |
/// | 3000–3999 | Server               | 500 Internal Server Error         |
/// | 4000–4999 | Business Rule        | 422 Unprocessable Entity / 403    |
#[derive(Debug, thiserror::Error)]
pub enum StorefrontError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unsupported aspect ratio tag.
    #[error("invalid aspect ratio: {0}")]
    InvalidAspectRatio(String),

    /// Account with the given ID was not found.
    #[error("account not found: {0}")]
    AccountNotFound(uuid::Uuid),

    /// Plan with the given ID was not found.
    #[error("plan not found: {0}")]
    PlanNotFound(uuid::Uuid),

    /// Purchase request with the given ID was not found.
    #[error("purchase request not found: {0}")]
    PurchaseNotFound(uuid::Uuid),

    /// Generation job with the given ID was not found in the caller's session.
    #[error("generation job not found: {0}")]
    JobNotFound(uuid::Uuid),

    /// Email or secret did not match any account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but has been banned.
    #[error("account is banned; please contact support")]
    AccountBanned,

    /// Missing, unknown or expired session token.
    #[error("authentication required")]
    Unauthorized,

    /// The session is valid but lacks the required role.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// An account with this email already exists.
    #[error("an account with email {0} already exists")]
    EmailTaken(String),

    /// The account balance cannot cover the requested amount.
    #[error("insufficient credits: balance {balance}, required {required}")]
    InsufficientCredits {
        /// Current balance.
        balance: u64,
        /// Amount that was requested.
        required: u64,
    },

    /// The operation is reserved for subscribed accounts.
    #[error("an approved purchase is required for this operation")]
    SubscriptionRequired,

    /// No completed generations are available to export.
    #[error("no completed images to export")]
    NothingToExport,

    /// Snapshot backend failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// The export archive itself could not be written.
    #[error("archive error: {0}")]
    Archive(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StorefrontError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidAspectRatio(_) => 1002,
            Self::AccountNotFound(_) => 2001,
            Self::PlanNotFound(_) => 2002,
            Self::PurchaseNotFound(_) => 2003,
            Self::JobNotFound(_) => 2004,
            Self::InvalidCredentials => 2101,
            Self::AccountBanned => 2102,
            Self::Unauthorized => 2103,
            Self::Forbidden(_) => 2104,
            Self::EmailTaken(_) => 2105,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::Archive(_) => 3002,
            Self::InsufficientCredits { .. } => 4001,
            Self::SubscriptionRequired => 4002,
            Self::NothingToExport => 4003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidAspectRatio(_) => StatusCode::BAD_REQUEST,
            Self::AccountNotFound(_)
            | Self::PlanNotFound(_)
            | Self::PurchaseNotFound(_)
            | Self::JobNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::AccountBanned | Self::Forbidden(_) | Self::SubscriptionRequired => {
                StatusCode::FORBIDDEN
            }
            Self::EmailTaken(_) => StatusCode::CONFLICT,
            Self::InsufficientCredits { .. } | Self::NothingToExport => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::PersistenceError(_) | Self::Archive(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_errors_map_to_auth_statuses() {
        assert_eq!(
            StorefrontError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            StorefrontError::AccountBanned.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            StorefrontError::EmailTaken("a@b.c".to_string()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn insufficient_credits_is_unprocessable() {
        let err = StorefrontError::InsufficientCredits {
            balance: 0,
            required: 1,
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.error_code(), 4001);
        assert!(err.to_string().contains("balance 0"));
    }

    #[test]
    fn into_response_sets_status() {
        let response = StorefrontError::NothingToExport.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
