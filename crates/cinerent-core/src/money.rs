//! # Money Module
//!
//! Provides the `Money` type used for prices, credit balances and payments.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Credit 0.30, rental 0.10 three times as floats:                        │
//! │    0.30 - 0.10 - 0.10 - 0.10 = 5.55e-17  ❌ not zero, 4th rent passes!  │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    30 - 10 - 10 - 10 = 0  → 4th rental is InsufficientCredit           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cinerent_core::money::Money;
//!
//! let credit = Money::from_cents(1000); // $10.00
//! let price = Money::from_cents(399);   // $3.99
//!
//! assert_eq!(credit.debit(price), Some(Money::from_cents(601)));
//! assert_eq!(price.debit(credit), None); // would go negative
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Where Money is Used
/// ```text
/// Movie.price_cents ──► rent() ──┬──► Ledger debit (User.credit_cents)
///                                └──► Payment.amount_cents
///
/// sum(Payment.amount_cents for user) == total debited from the user
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use cinerent_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Whether this balance can pay `price` without going negative.
    #[inline]
    pub const fn covers(&self, price: Money) -> bool {
        self.0 >= price.0
    }

    /// Returns the balance left after paying `price`, or `None` when the
    /// balance does not cover it.
    ///
    /// ## User Workflow
    /// ```text
    /// Credit: $3.00   Price: $3.00
    ///      │
    ///      ▼
    /// debit($3.00) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Some($0.00)   (exactly enough is enough)
    ///
    /// Credit: $2.99   Price: $3.00  →  None → InsufficientCredit
    /// ```
    pub const fn debit(&self, price: Money) -> Option<Money> {
        if self.covers(price) {
            Some(Money(self.0 - price.0))
        } else {
            None
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money as dollars for logs and error messages.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
