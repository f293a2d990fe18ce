//! # Coordinators
//!
//! Multi-step operations, each one atomic unit of work.
//!
//! ## Shape of every coordinator call
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate input            ← no unit of work open yet                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  timeout(budget, async {                                               │
//! │      tx = db.begin()       ← BEGIN IMMEDIATE                           │
//! │      checks ... writes     ← any `?` drops tx = ROLLBACK               │
//! │      Database::commit(tx)                                              │
//! │  })                                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  elapsed → RentalError::Timeout (tx dropped, rolled back)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Coordinators
//!
//! - [`RentalCoordinator`] - rent a copy against the user's credit
//! - [`ReturnCoordinator`] - return a copy and close its rental
//! - [`CapacityAdjuster`] - grow or shrink a movie's copy pool
//! - [`CatalogCoordinator`] - movie (de)activation and read-side queries

pub mod capacity;
pub mod catalog;
pub mod rental;
pub mod returns;

pub use capacity::CapacityAdjuster;
pub use catalog::CatalogCoordinator;
pub use rental::RentalCoordinator;
pub use returns::ReturnCoordinator;

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{RentalError, RentalResult};

/// Runs `work` with a time budget.
///
/// On elapse the future is dropped, which drops its transaction and rolls
/// it back before the error is returned.
pub(crate) async fn within<T, F>(budget: Duration, work: F) -> RentalResult<T>
where
    F: Future<Output = RentalResult<T>>,
{
    match tokio::time::timeout(budget, work).await {
        Ok(result) => result,
        Err(_) => {
            warn!(?budget, "Unit of work timed out and was rolled back");
            Err(RentalError::Timeout(budget))
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the coordinator tests.

    use crate::pool::{Database, DbConfig};
    use crate::repository::{CopyPool, Ledger, MovieRepository};
    use cinerent_core::{CopyState, Money, MovieId, UserId};

    pub async fn database() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn movie(db: &Database, price_cents: Option<i64>, available: i64) -> MovieId {
        let mut conn = db.pool().acquire().await.unwrap();
        let movie = MovieRepository::insert(&mut conn, "Alien", price_cents)
            .await
            .unwrap();
        CopyPool::insert_copies(&mut conn, &movie.id, available, CopyState::Available)
            .await
            .unwrap();
        movie.id
    }

    pub async fn user(db: &Database, credit_cents: i64) -> UserId {
        let mut conn = db.pool().acquire().await.unwrap();
        Ledger::insert_user(&mut conn, "ana", Money::from_cents(credit_cents))
            .await
            .unwrap()
            .id
    }

    pub async fn balance(db: &Database, user: &UserId) -> Money {
        let mut conn = db.pool().acquire().await.unwrap();
        Ledger::balance(&mut conn, user).await.unwrap()
    }
}
