//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur in the application.
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Invalid or missing agent tokens
/// - **Resource Errors**: Requested resources not found
/// - **Financial Errors**: Operations that would corrupt the ledger
/// - **Validation Errors**: Invalid request data
///
/// # Propagation Policy
///
/// Validation and state errors are raised before any wallet write, so a
/// failed request never leaves a partial financial state behind. Wallet
/// mutation failures always propagate and abort the whole operation.
/// Notification failures, by contrast, are logged and swallowed by the
/// notification service and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Agent token is missing, invalid, or revoked.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid agent token")]
    InvalidToken,

    /// Caller's role does not permit the requested operation.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Admin role required for this operation")]
    Forbidden,

    /// Requested commission does not exist (or is not visible to the caller).
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Commission not found")]
    CommissionNotFound,

    /// Requested wallet does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Wallet not found")]
    WalletNotFound,

    /// Requested withdrawal request does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Withdrawal request not found")]
    WithdrawalNotFound,

    /// Requested status change is not a legal state-machine transition,
    /// e.g. re-paying a paid commission or approving a non-pending
    /// withdrawal request.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Derived commission amount is invalid (e.g., negative after TDS).
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Wallet balance cannot cover the requested withdrawal debit.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// Wallet is suspended or blocked; no mutations are allowed.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Wallet is {0}; mutations are not allowed")]
    WalletInactive(String),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `InvalidToken` → 401 Unauthorized
/// - `Forbidden` → 403 Forbidden
/// - `CommissionNotFound` / `WalletNotFound` / `WithdrawalNotFound` → 404 Not Found
/// - `InvalidStateTransition` → 409 Conflict
/// - `InvalidAmount` / `InvalidRequest` → 400 Bad Request
/// - `InsufficientBalance` / `WalletInactive` → 422 Unprocessable Entity
/// - `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", self.to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            AppError::CommissionNotFound
            | AppError::WalletNotFound
            | AppError::WithdrawalNotFound => {
                (StatusCode::NOT_FOUND, "not_found", self.to_string())
            }
            AppError::InvalidStateTransition(ref msg) => (
                StatusCode::CONFLICT,
                "invalid_state_transition",
                msg.clone(),
            ),
            AppError::InvalidAmount(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_amount", msg.clone())
            }
            AppError::InsufficientBalance => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_balance",
                self.to_string(),
            ),
            AppError::WalletInactive(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "wallet_inactive",
                self.to_string(),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        // Build JSON response body
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        // Return the response with status code and JSON body
        (status, body).into_response()
    }
}
