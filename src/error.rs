//! Error types for the Bibliotheca server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Numeric error codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NotFound = 4,
    BookNotAvailable = 5,
    Duplicate = 6,
    MaxBorrowsReached = 7,
    MemberNotEligible = 8,
    AlreadyReturned = 9,
    NoOpenLoan = 10,
    BookAvailable = 11,
    ReservationNotActive = 12,
    BadValue = 13,
}

/// Violated lending rule. The message names the rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LendingViolation {
    #[error("Member is not eligible to borrow (inactive account or expired membership)")]
    MemberIneligible,

    #[error("Borrow limit reached ({current}/{limit} open loans)")]
    BorrowCapReached { current: i64, limit: i64 },

    #[error("Book is not available for borrowing")]
    BookUnavailable,

    #[error("Book has already been returned")]
    AlreadyReturned,

    #[error("No active borrow record found for this book")]
    NoOpenLoan,

    #[error("Book is currently available; borrow it instead of reserving")]
    BookAvailable,

    #[error("Reservation is no longer active")]
    ReservationNotActive,
}

impl LendingViolation {
    pub fn code(&self) -> ErrorCode {
        match self {
            LendingViolation::MemberIneligible => ErrorCode::MemberNotEligible,
            LendingViolation::BorrowCapReached { .. } => ErrorCode::MaxBorrowsReached,
            LendingViolation::BookUnavailable => ErrorCode::BookNotAvailable,
            LendingViolation::AlreadyReturned => ErrorCode::AlreadyReturned,
            LendingViolation::NoOpenLoan => ErrorCode::NoOpenLoan,
            LendingViolation::BookAvailable => ErrorCode::BookAvailable,
            LendingViolation::ReservationNotActive => ErrorCode::ReservationNotActive,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("{0}")]
    Lending(#[from] LendingViolation),
}

impl AppError {
    /// Map a unique-constraint violation to `Conflict`, anything else to `Database`
    pub fn from_unique_violation(err: sqlx::Error, message: &str) -> Self {
        Self::conflict_on(err, "23505", message)
    }

    /// Map a rejected delete of a still-referenced row to `Conflict`
    pub fn from_foreign_key_violation(err: sqlx::Error, message: &str) -> Self {
        Self::conflict_on(err, "23503", message)
    }

    fn conflict_on(err: sqlx::Error, sqlstate: &str, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some(sqlstate) {
                return AppError::Conflict(message.to_string());
            }
        }
        AppError::Database(err)
    }

    fn parts(&self) -> (StatusCode, ErrorCode, String) {
        match self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::DbFailure,
                "Database error".to_string(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone()),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::Failure,
                "Internal server error".to_string(),
            ),
            AppError::Lending(violation) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                violation.code(),
                violation.to_string(),
            ),
        }
    }

    /// Message safe to show to the caller (internal details are hidden)
    pub fn public_message(&self) -> String {
        self.parts().2
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(e) => tracing::error!("Database error: {:?}", e),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            _ => {}
        }

        let (status, code, message) = self.parts();

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
