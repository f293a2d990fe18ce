//! # Validation Module
//!
//! Input validation for the rental core.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Boundary (HTTP handler, outside this workspace)              │
//! │  └── Parses transport encoding, authenticates the user                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any unit of work opens)                  │
//! │  ├── end date is a real date and not in the past                       │
//! │  └── capacity target within 0..=MAX_COPIES_PER_MOVIE                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (state IN (...)), CHECK (credit_cents >= 0)                 │
//! │  └── one active rental per copy (partial UNIQUE index)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::MAX_COPIES_PER_MOVIE;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Date Validators
// =============================================================================

/// Parses a rental end date given as `YYYY-MM-DD`.
///
/// ## Example
/// ```rust
/// use cinerent_core::validation::parse_end_date;
///
/// assert!(parse_end_date("2025-02-28").is_ok());
/// assert!(parse_end_date("2025-02-30").is_err()); // no such day
/// assert!(parse_end_date("").is_err());
/// ```
pub fn parse_end_date(raw: &str) -> ValidationResult<NaiveDate> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Err(ValidationError::Required {
            field: "end_date".to_string(),
        });
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| ValidationError::InvalidFormat {
        field: "end_date".to_string(),
        reason: e.to_string(),
    })
}

/// Validates that a rental ending on `end_date` may start on `today`.
///
/// ## Rules
/// - Same-day rentals are allowed (`end_date == today`)
/// - Anything earlier is rejected
///
/// ## User Workflow
/// ```text
/// Rent "Alien" until 2025-03-01, today is 2025-03-02
///      │
///      ▼
/// validate_end_date ← THIS FUNCTION
///      │
///      ▼
/// DateInPast → nothing is reserved, nothing is debited
/// ```
pub fn validate_end_date(end_date: NaiveDate, today: NaiveDate) -> ValidationResult<()> {
    if end_date < today {
        return Err(ValidationError::DateInPast {
            field: "end_date".to_string(),
            date: end_date,
            earliest: today,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a capacity target.
///
/// ## Rules
/// - Must be non-negative (zero retires every available copy)
/// - Must not exceed MAX_COPIES_PER_MOVIE
pub fn validate_capacity_target(target: i64) -> ValidationResult<()> {
    if !(0..=MAX_COPIES_PER_MOVIE).contains(&target) {
        return Err(ValidationError::OutOfRange {
            field: "target_count".to_string(),
            min: 0,
            max: MAX_COPIES_PER_MOVIE,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free rentals)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a credit balance in cents. Balances are never negative.
pub fn validate_credit_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "credit".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
