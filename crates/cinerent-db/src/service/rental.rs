//! # Rental Coordinator
//!
//! Rents one copy of a movie to a user, paid from the user's credit.
//!
//! ## Rent Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  rent(user, movie, end_date)                                           │
//! │       │                                                                 │
//! │       ├── end_date < today?          → Validation   (nothing opened)   │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE                                                       │
//! │       ├── movie missing?             → NotFound                        │
//! │       ├── user missing / inactive?   → NotFound                        │
//! │       ├── no available copy?         → OutOfStock                      │
//! │       ├── movie has no price?        → Configuration (MissingPrice)    │
//! │       ├── credit < price?            → InsufficientCredit              │
//! │       ▼                                                                 │
//! │  debit ledger (compare-and-set)                                        │
//! │  reserve copy (retry another copy if it was taken)                     │
//! │  insert rental (active) + payment                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ── any failure above rolls every write back                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument, warn};

use crate::config::RentalConfig;
use crate::error::{RentalError, RentalResult};
use crate::pool::{Database, UnitOfWork};
use crate::repository::{CopyPool, Ledger, MovieRepository, RentalRepository};
use crate::service::within;
use cinerent_core::validation::{parse_end_date, validate_end_date};
use cinerent_core::{CopyId, CoreError, Money, MovieId, Rental, UserId};

/// Rents copies.
#[derive(Debug, Clone)]
pub struct RentalCoordinator {
    db: Database,
    config: RentalConfig,
}

impl RentalCoordinator {
    pub fn new(db: Database, config: RentalConfig) -> Self {
        RentalCoordinator { db, config }
    }

    /// Rents one available copy of `movie_id` to `user_id` until `end_date`.
    ///
    /// The rental starts today (UTC). On success the user's credit is lower
    /// by exactly the movie's price, one copy moved to `rented`, and one
    /// rental plus one payment exist. On any error none of that happened.
    #[instrument(skip(self))]
    pub async fn rent(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
        end_date: NaiveDate,
    ) -> RentalResult<Rental> {
        let today = Utc::now().date_naive();
        if let Err(e) = validate_end_date(end_date, today) {
            warn!(error = %e, "Rent rejected");
            return Err(e.into());
        }

        let result = within(
            self.config.unit_of_work_timeout,
            self.rent_in_unit_of_work(user_id, movie_id, today, end_date),
        )
        .await;

        match &result {
            Ok(rental) => info!(
                rental_id = %rental.id,
                copy_id = %rental.copy_id,
                "Rental committed"
            ),
            Err(e) => warn!(error = %e, kind = ?e.kind(), "Rent rolled back"),
        }
        result
    }

    /// Same as [`rent`](Self::rent) with the end date given as `YYYY-MM-DD`.
    pub async fn rent_until(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
        end_date: &str,
    ) -> RentalResult<Rental> {
        let end_date = parse_end_date(end_date)?;
        self.rent(user_id, movie_id, end_date).await
    }

    async fn rent_in_unit_of_work(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
        today: NaiveDate,
        end_date: NaiveDate,
    ) -> RentalResult<Rental> {
        let mut tx = self.db.begin().await?;

        let movie = MovieRepository::get(&mut tx, movie_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Movie", movie_id.as_str()))?;

        let user = Ledger::get_user(&mut tx, user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| CoreError::not_found("User", user_id.as_str()))?;

        let out_of_stock = || CoreError::OutOfStock {
            movie_id: movie_id.to_string(),
        };

        if !movie.is_active {
            return Err(out_of_stock().into());
        }
        let mut copy_id = CopyPool::find_available(&mut tx, movie_id)
            .await?
            .ok_or_else(out_of_stock)?;

        let price = movie.price().ok_or_else(|| CoreError::MissingPrice {
            movie_id: movie_id.to_string(),
        })?;

        Ledger::debit(&mut tx, user_id, user.credit(), price).await?;

        let mut attempt = 1;
        loop {
            match CopyPool::reserve(&mut tx, &copy_id).await {
                Ok(()) => break,
                Err(RentalError::Core(CoreError::InvalidTransition { .. }))
                    if attempt < self.config.reserve_attempts =>
                {
                    warn!(copy_id = %copy_id, attempt, "Copy taken, selecting another");
                    attempt += 1;
                    copy_id = CopyPool::find_available(&mut tx, movie_id)
                        .await?
                        .ok_or_else(out_of_stock)?;
                }
                Err(RentalError::Core(CoreError::InvalidTransition { .. })) => {
                    return Err(out_of_stock().into());
                }
                Err(e) => return Err(e),
            }
        }

        let rental = Self::record(&mut tx, user_id, &copy_id, today, end_date, price).await?;

        Database::commit(tx).await?;
        Ok(rental)
    }

    async fn record(
        tx: &mut UnitOfWork,
        user_id: &UserId,
        copy_id: &CopyId,
        today: NaiveDate,
        end_date: NaiveDate,
        price: Money,
    ) -> RentalResult<Rental> {
        let rental =
            RentalRepository::insert_rental(tx, user_id, copy_id, today, end_date).await?;
        RentalRepository::insert_payment(tx, &rental.id, price).await?;
        Ok(rental)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
