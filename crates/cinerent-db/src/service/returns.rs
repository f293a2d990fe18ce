//! # Return Coordinator
//!
//! Brings a copy back into the pool and closes its rental.
//!
//! ```text
//! return_copy(copy)
//!      │
//!      ▼
//! BEGIN IMMEDIATE
//!      ├── copy missing?        → NotFound
//!      ├── copy rented?         → release: available (movie active)
//!      │                                   inactive  (movie deactivated)
//!      │   otherwise            → leave it alone
//!      ├── close active rental (if any)
//!      ▼
//! COMMIT
//! ```
//!
//! A second return of the same copy finds nothing to release and nothing to
//! close, so it commits an empty unit of work and reports no change.

use tracing::{info, instrument};

use crate::config::RentalConfig;
use crate::error::RentalResult;
use crate::pool::Database;
use crate::repository::{CopyPool, MovieRepository, RentalRepository};
use crate::service::within;
use cinerent_core::{CopyId, CopyState, CoreError, ReturnOutcome};

/// Processes returns.
#[derive(Debug, Clone)]
pub struct ReturnCoordinator {
    db: Database,
    config: RentalConfig,
}

impl ReturnCoordinator {
    pub fn new(db: Database, config: RentalConfig) -> Self {
        ReturnCoordinator { db, config }
    }

    /// Returns a copy. Idempotent.
    #[instrument(skip(self))]
    pub async fn return_copy(&self, copy_id: &CopyId) -> RentalResult<ReturnOutcome> {
        let outcome = within(
            self.config.unit_of_work_timeout,
            self.return_in_unit_of_work(copy_id),
        )
        .await?;

        if let Some(rental_id) = &outcome.closed_rental {
            info!(rental_id = %rental_id, state = %outcome.copy_state, "Return committed");
        } else {
            info!(state = %outcome.copy_state, "Copy was not out on rental, nothing to return");
        }
        Ok(outcome)
    }

    async fn return_in_unit_of_work(&self, copy_id: &CopyId) -> RentalResult<ReturnOutcome> {
        let mut tx = self.db.begin().await?;

        let copy = CopyPool::get(&mut tx, copy_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Copy", copy_id.as_str()))?;

        let movie = MovieRepository::get(&mut tx, &copy.movie_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Movie", copy.movie_id.as_str()))?;

        let copy_state = if copy.state == CopyState::Rented {
            CopyPool::release(&mut tx, copy_id, movie.is_active).await?
        } else {
            copy.state
        };

        let closed_rental = RentalRepository::close_active(&mut tx, copy_id).await?;

        Database::commit(tx).await?;

        Ok(ReturnOutcome {
            copy_id: copy_id.clone(),
            closed_rental,
            copy_state,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
