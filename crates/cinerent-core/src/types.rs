//! # Domain Types
//!
//! Records owned by the rental core.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐  1..*  ┌─────────────────┐                         │
//! │  │     Movie       │───────►│   MovieCopy     │                         │
//! │  │  price_cents?   │        │  state          │                         │
//! │  │  is_active      │        └────────┬────────┘                         │
//! │  └─────────────────┘                 │ 0..* (≤1 active)                 │
//! │                                      ▼                                  │
//! │  ┌─────────────────┐  1..*  ┌─────────────────┐  1   ┌───────────────┐  │
//! │  │      User       │───────►│     Rental      │─────►│    Payment    │  │
//! │  │  credit_cents   │        │  status         │      │  amount_cents │  │
//! │  └─────────────────┘        │  start / end    │      └───────────────┘  │
//! │                             └─────────────────┘                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity is keyed by a UUID v4 string. The newtypes below keep a
//! `CopyId` from being passed where a `MovieId` is expected.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::inventory::CopyState;
use crate::money::Money;

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
        #[ts(export)]
        pub struct $name(#[ts(as = "String")] String);

        impl $name {
            /// Wraps an existing identifier.
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            /// Generates a fresh UUID v4 identifier.
            pub fn generate() -> Self {
                $name(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                $name(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                $name(id.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a movie title.
    MovieId
);
entity_id!(
    /// Identifier of one rentable copy ("product").
    CopyId
);
entity_id!(
    /// Identifier of a customer account.
    UserId
);
entity_id!(
    /// Identifier of a rental record.
    RentalId
);
entity_id!(
    /// Identifier of a payment record.
    PaymentId
);

// =============================================================================
// Movie
// =============================================================================

/// A rentable title. Soft-deleted via `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Rental price. `None` means the movie cannot be rented yet.
    pub price_cents: Option<i64>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Movie {
    /// Returns the price as Money, if one is configured.
    #[inline]
    pub fn price(&self) -> Option<Money> {
        self.price_cents.map(Money::from_cents)
    }
}

// =============================================================================
// Copy
// =============================================================================

/// One physical or virtual copy of a movie.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MovieCopy {
    pub id: CopyId,
    pub movie_id: MovieId,
    pub state: CopyState,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// User
// =============================================================================

/// The slice of a customer account the core cares about: its ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Credit balance in cents. Never negative.
    pub credit_cents: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Returns the credit balance as Money.
    #[inline]
    pub fn credit(&self) -> Money {
        Money::from_cents(self.credit_cents)
    }
}

// =============================================================================
// Rental Status
// =============================================================================

/// The status of a rental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    /// Copy is out with the customer.
    #[default]
    Active,
    /// Copy came back. Terminal.
    Returned,
}

// =============================================================================
// Rental
// =============================================================================

/// A rental of one copy by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rental {
    pub id: RentalId,
    pub user_id: UserId,
    pub copy_id: CopyId,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub status: RentalStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub returned_at: Option<DateTime<Utc>>,
}

impl Rental {
    /// Whether the rental still pins its copy.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == RentalStatus::Active
    }

    /// Whether the rental is still active after its end date.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_active() && today > self.end_date
    }
}

/// A rental joined with the movie it is for, as listed on a user's page.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RentalSummary {
    pub rental: Rental,
    pub movie_id: MovieId,
    pub title: String,
    pub amount_cents: i64,
}

/// What a return did.
///
/// `closed_rental` is `None` when the copy had no active rental, i.e. the
/// return was a repeat and nothing changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReturnOutcome {
    pub copy_id: CopyId,
    pub closed_rental: Option<RentalId>,
    pub copy_state: CopyState,
}

impl ReturnOutcome {
    /// Whether this call actually closed a rental.
    #[inline]
    pub fn changed(&self) -> bool {
        self.closed_rental.is_some()
    }
}

// =============================================================================
// Payment
// =============================================================================

/// The payment recorded with a rental. Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub id: PaymentId,
    pub rental_id: RentalId,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rental(status: RentalStatus, end: NaiveDate) -> Rental {
        Rental {
            id: RentalId::generate(),
            user_id: UserId::new("u-1"),
            copy_id: CopyId::new("c-1"),
            start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            end_date: end,
            status,
            created_at: Utc::now(),
            returned_at: None,
        }
    }

    #[test]
    fn test_ids_are_distinct_and_transparent() {
        let a = CopyId::generate();
        let b = CopyId::generate();
        assert_ne!(a, b);
        assert_eq!(
            serde_json::to_string(&MovieId::new("m-1")).unwrap(),
            "\"m-1\""
        );
    }

    #[test]
    fn test_rental_status_default() {
        assert_eq!(RentalStatus::default(), RentalStatus::Active);
    }

    #[test]
    fn test_overdue_only_while_active() {
        let end = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        let later = NaiveDate::from_ymd_opt(2025, 3, 6).unwrap();

        assert!(rental(RentalStatus::Active, end).is_overdue(later));
        assert!(!rental(RentalStatus::Active, end).is_overdue(end));
        assert!(!rental(RentalStatus::Returned, end).is_overdue(later));
    }

    #[test]
    fn test_movie_without_price() {
        let movie = Movie {
            id: MovieId::generate(),
            title: "Metropolis".to_string(),
            price_cents: None,
            is_active: true,
            created_at: Utc::now(),
        };
        assert_eq!(movie.price(), None);
    }
}
