//! # Error Types
//!
//! Domain-specific error types for cinerent-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cinerent-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  cinerent-db errors (separate crate)                                   │
//! │  ├── DbError          - Storage faults                                 │
//! │  └── RentalError      - What coordinators return (Core | Storage |     │
//! │                         Timeout), classified by ErrorKind              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → RentalError → boundary layer      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::inventory::CopyState;
use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the rental core.
///
/// Every variant is detected before a unit of work commits, so seeing one
/// of these means nothing was written.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced movie, copy or user does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The movie has no `available` copy right now.
    ///
    /// ## User Workflow
    /// ```text
    /// Rent "Alien" ──► find available copy ──► none
    ///      │
    ///      ▼
    /// OutOfStock { movie_id } ──► UI: "All copies are rented, try later"
    /// ```
    #[error("No available copy for movie {movie_id}")]
    OutOfStock { movie_id: String },

    /// The user's credit does not cover the rental price.
    #[error("Insufficient credit for user {user_id}: balance {balance}, price {price}")]
    InsufficientCredit {
        user_id: String,
        balance: Money,
        price: Money,
    },

    /// The movie cannot be rented because it has no price configured.
    #[error("Movie {movie_id} has no price configured")]
    MissingPrice { movie_id: String },

    /// A copy was asked to make a transition its state machine forbids.
    #[error("Copy {copy_id} cannot move from {from} to {to}")]
    InvalidTransition {
        copy_id: String,
        from: CopyState,
        to: CopyState,
    },

    /// The operation collided with the current state of the catalogue
    /// (e.g. deactivating a movie whose copies are out on rental).
    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    /// A shrink request would have to retire rented copies.
    #[error("Cannot shrink movie {movie_id} to {target} copies: {rented} rented, {available} available")]
    CapacityBelowRented {
        movie_id: String,
        target: i64,
        rented: i64,
        available: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(reason: impl Into<String>) -> Self {
        CoreError::Conflict {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are raised before any unit of work is opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A date lies before the earliest date it may take.
    #[error("{field} {date} is earlier than {earliest}")]
    DateInPast {
        field: String,
        date: chrono::NaiveDate,
        earliest: chrono::NaiveDate,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
