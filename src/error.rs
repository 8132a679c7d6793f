//! Error types for the library server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Machine-readable error codes returned alongside every error message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NotFound = 4,
    BadValue = 5,
    Duplicate = 6,
    NoAvailableCopy = 7,
    MaxIssuesReached = 8,
    AlreadyHoldsBook = 9,
    AlreadyReturned = 10,
    InsufficientAvailableCopies = 11,
    HasIssueHistory = 12,
    CopyNotAvailable = 13,
    IssueStillOpen = 14,
}

/// Lending and inventory rules that reject a request without touching state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("No available copies of this book")]
    NoAvailableCopy,

    #[error("A reader cannot hold more than {max} books at the same time")]
    MaxIssuesReached { max: i64 },

    #[error("The reader already holds a copy of this book")]
    AlreadyHoldsBook,

    #[error("This book has already been returned")]
    AlreadyReturned,

    #[error("Cannot reduce quantity by {requested}: only {available} copies are available")]
    InsufficientAvailableCopies { requested: i64, available: i64 },

    #[error("Cannot delete a book that has been issued")]
    BookWasIssued,

    #[error("Cannot delete a copy that has been issued")]
    CopyWasIssued,

    #[error("Only an available copy can be removed")]
    CopyNotAvailable,

    #[error("An issue can only be deleted once the book is returned")]
    IssueStillOpen,
}

impl RuleViolation {
    pub fn code(&self) -> ErrorCode {
        match self {
            RuleViolation::NoAvailableCopy => ErrorCode::NoAvailableCopy,
            RuleViolation::MaxIssuesReached { .. } => ErrorCode::MaxIssuesReached,
            RuleViolation::AlreadyHoldsBook => ErrorCode::AlreadyHoldsBook,
            RuleViolation::AlreadyReturned => ErrorCode::AlreadyReturned,
            RuleViolation::InsufficientAvailableCopies { .. } => {
                ErrorCode::InsufficientAvailableCopies
            }
            RuleViolation::BookWasIssued | RuleViolation::CopyWasIssued => {
                ErrorCode::HasIssueHistory
            }
            RuleViolation::CopyNotAvailable => ErrorCode::CopyNotAvailable,
            RuleViolation::IssueStillOpen => ErrorCode::IssueStillOpen,
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

    #[error("Business rule violation: {0}")]
    BusinessRule(#[from] RuleViolation),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{}: {}", field, msg),
                    None => format!("{}: invalid value", field),
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join("; "))
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl AppError {
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
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone()),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::BusinessRule(rule) => {
                (StatusCode::UNPROCESSABLE_ENTITY, rule.code(), rule.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
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

/// Map a unique-constraint violation to a client-facing conflict, leave anything else as is
pub fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_violation_maps_to_unprocessable() {
        let err = AppError::from(RuleViolation::MaxIssuesReached { max: 3 });
        let (status, code, message) = err.parts();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, ErrorCode::MaxIssuesReached);
        assert!(message.contains('3'));
    }

    #[test]
    fn test_database_error_is_hidden() {
        let err = AppError::Database(sqlx::Error::RowNotFound);
        let (status, code, message) = err.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, ErrorCode::DbFailure);
        assert_eq!(message, "Database error");
    }

    #[test]
    fn test_auth_statuses() {
        assert_eq!(
            AppError::Authentication("x".into()).parts().0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Authorization("x".into()).parts().0, StatusCode::FORBIDDEN);
        assert_eq!(AppError::Conflict("x".into()).parts().0, StatusCode::CONFLICT);
    }

    #[test]
    fn test_non_unique_error_stays_database() {
        let err = conflict_on_unique(sqlx::Error::RowNotFound, "dup");
        assert!(matches!(err, AppError::Database(_)));
    }
}
