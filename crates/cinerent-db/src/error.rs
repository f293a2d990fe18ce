//! # Database and Coordinator Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError ← Adds categorization (busy, constraint, pool, ...)           │
//! │       │                                                                 │
//! │       │         CoreError (cinerent-core) ← business rule violations   │
//! │       │              │                                                  │
//! │       ▼              ▼                                                  │
//! │  RentalError ← What every coordinator returns                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ErrorKind / ErrorBody ← Boundary layer maps to status codes           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use cinerent_core::{CoreError, ValidationError};

// =============================================================================
// Database Error
// =============================================================================

/// Database operation errors.
///
/// These errors wrap sqlx errors and classify them so the coordinators can
/// tell a retryable fault from a broken query.
#[derive(Debug, Error)]
pub enum DbError {
    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - A second active rental for the same copy (partial unique index)
    /// - A second payment for the same rental
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative credit, unknown state, ...).
    #[error("Check constraint failed: {message}")]
    CheckViolation { message: String },

    /// Another writer holds the database lock and the busy timeout elapsed.
    #[error("Database is busy: {0}")]
    Busy(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed to begin or commit.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Whether retrying the whole unit of work later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DbError::Busy(_)
                | DbError::PoolExhausted
                | DbError::ConnectionFailed(_)
                | DbError::TransactionFailed(_)
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → Analyze code/message for constraint or lock
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                // SQLITE_BUSY (5), SQLITE_LOCKED (6) and their extended codes
                let code = db_err.code().and_then(|c| c.parse::<i32>().ok());
                let busy = matches!(code.map(|c| c & 0xff), Some(5) | Some(6));

                if busy || msg.contains("database is locked") {
                    DbError::Busy(msg.to_string())
                } else if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Rental Error
// =============================================================================

/// Error returned by every coordinator.
///
/// A `RentalError` always means the unit of work was rolled back (or never
/// opened). Nothing half-applied is ever visible.
#[derive(Debug, Error)]
pub enum RentalError {
    /// Business rule violation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage fault.
    #[error(transparent)]
    Storage(#[from] DbError),

    /// The unit of work did not finish within its time budget.
    #[error("Unit of work timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<ValidationError> for RentalError {
    fn from(err: ValidationError) -> Self {
        RentalError::Core(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for RentalError {
    fn from(err: sqlx::Error) -> Self {
        RentalError::Storage(DbError::from(err))
    }
}

/// Result type for coordinator operations.
pub type RentalResult<T> = Result<T, RentalError>;

/// Error taxonomy exposed to the boundary layer.
///
/// ## Usage in a handler
/// ```rust,ignore
/// match coordinator.rent(&user, &movie, end).await {
///     Ok(rental) => Json(rental).into_response(),
///     Err(e) => (StatusCode::from_u16(e.kind().status_hint())?, Json(e.to_body())).into_response(),
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed or illegal input (400)
    Validation,
    /// Referenced entity absent (404)
    NotFound,
    /// No available copy (409)
    OutOfStock,
    /// Balance below price (402)
    InsufficientCredit,
    /// Movie has no price (422)
    Configuration,
    /// Illegal state transition (409)
    Conflict,
    /// Shrink below rented count (409)
    Capacity,
    /// Infrastructure failure, retryable (503)
    StorageFault,
}

impl ErrorKind {
    /// Suggested HTTP status for the boundary layer.
    pub const fn status_hint(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::OutOfStock => 409,
            ErrorKind::InsufficientCredit => 402,
            ErrorKind::Configuration => 422,
            ErrorKind::Conflict => 409,
            ErrorKind::Capacity => 409,
            ErrorKind::StorageFault => 503,
        }
    }
}

impl RentalError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RentalError::Core(core) => match core {
                CoreError::Validation(_) => ErrorKind::Validation,
                CoreError::NotFound { .. } => ErrorKind::NotFound,
                CoreError::OutOfStock { .. } => ErrorKind::OutOfStock,
                CoreError::InsufficientCredit { .. } => ErrorKind::InsufficientCredit,
                CoreError::MissingPrice { .. } => ErrorKind::Configuration,
                CoreError::InvalidTransition { .. } | CoreError::Conflict { .. } => {
                    ErrorKind::Conflict
                }
                CoreError::CapacityBelowRented { .. } => ErrorKind::Capacity,
            },
            // A constraint firing means a concurrent writer won a race the
            // conditional updates did not catch.
            RentalError::Storage(DbError::UniqueViolation { .. })
            | RentalError::Storage(DbError::CheckViolation { .. }) => ErrorKind::Conflict,
            RentalError::Storage(_) | RentalError::Timeout(_) => ErrorKind::StorageFault,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            RentalError::Timeout(_) => true,
            RentalError::Storage(db) => db.is_retryable(),
            RentalError::Core(_) => false,
        }
    }

    /// Serializable body for the boundary layer.
    ///
    /// Storage details stay in the logs; callers only see a generic message.
    pub fn to_body(&self) -> ErrorBody {
        let kind = self.kind();
        let message = match (kind, self) {
            (ErrorKind::StorageFault, RentalError::Storage(e)) => {
                tracing::error!(error = %e, "Storage fault in unit of work");
                "Storage temporarily unavailable".to_string()
            }
            _ => self.to_string(),
        };
        ErrorBody {
            code: kind,
            message,
            retryable: self.is_retryable(),
        }
    }
}

/// What the boundary layer serializes when an operation fails.
///
/// ```json
/// { "code": "OUT_OF_STOCK", "message": "No available copy for movie ...", "retryable": false }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cinerent_core::Money;

    #[test]
    fn test_kind_mapping() {
        let err: RentalError = CoreError::OutOfStock {
            movie_id: "m-1".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::OutOfStock);
        assert!(!err.is_retryable());

        let err: RentalError = CoreError::InsufficientCredit {
            user_id: "u-1".to_string(),
            balance: Money::from_cents(1),
            price: Money::from_cents(2),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InsufficientCredit);
        assert_eq!(err.kind().status_hint(), 402);

        let err: RentalError = CoreError::MissingPrice {
            movie_id: "m-1".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_storage_faults_are_retryable() {
        let err = RentalError::Storage(DbError::Busy("database is locked".to_string()));
        assert_eq!(err.kind(), ErrorKind::StorageFault);
        assert!(err.is_retryable());

        let err = RentalError::Timeout(std::time::Duration::from_secs(5));
        assert!(err.is_retryable());

        let err = RentalError::Storage(DbError::QueryFailed("no such column".to_string()));
        assert_eq!(err.kind(), ErrorKind::StorageFault);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_body_hides_storage_details() {
        let err = RentalError::Storage(DbError::Internal("disk I/O error at page 7".to_string()));
        let body = serde_json::to_value(err.to_body()).unwrap();
        assert_eq!(body["code"], "STORAGE_FAULT");
        assert_eq!(body["message"], "Storage temporarily unavailable");
        assert_eq!(body["retryable"], false);
    }

    #[test]
    fn test_body_keeps_business_message() {
        let err: RentalError = CoreError::conflict("movie m-1 has active rentals").into();
        let body = err.to_body();
        assert_eq!(body.message, "Conflict: movie m-1 has active rentals");
        assert_eq!(body.code, ErrorKind::Conflict);
    }

    #[test]
    fn test_validation_converts() {
        let err: RentalError = ValidationError::Required {
            field: "end_date".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
