//! # Capacity Adjuster
//!
//! Sets how many copies of a movie are in service.
//!
//! ## Example
//! ```text
//! before: available 2, rented 1, inactive 1      set_capacity(movie, 5)
//!
//!   in service = 3, shortfall = 2
//!   reactivate 1 inactive copy, mint 1 new copy
//!
//! after:  available 4, rented 1, inactive 0      (total 5)
//! ```
//!
//! Shrinking retires `available` copies only, newest first. A target below
//! what is out on rental fails with `CapacityBelowRented` and writes
//! nothing.

use tracing::{info, instrument, warn};

use crate::config::RentalConfig;
use crate::error::RentalResult;
use crate::pool::Database;
use crate::repository::{CopyPool, MovieRepository};
use crate::service::within;
use cinerent_core::validation::validate_capacity_target;
use cinerent_core::{CopyCounts, CoreError, MovieId};

/// Resizes copy pools.
#[derive(Debug, Clone)]
pub struct CapacityAdjuster {
    db: Database,
    config: RentalConfig,
}

impl CapacityAdjuster {
    pub fn new(db: Database, config: RentalConfig) -> Self {
        CapacityAdjuster { db, config }
    }

    /// Grows or shrinks the movie's in-service copies to `target`.
    ///
    /// Returns the counts after the change.
    #[instrument(skip(self))]
    pub async fn set_capacity(&self, movie_id: &MovieId, target: i64) -> RentalResult<CopyCounts> {
        validate_capacity_target(target)?;

        let result = within(
            self.config.unit_of_work_timeout,
            self.resize_in_unit_of_work(movie_id, target),
        )
        .await;

        match &result {
            Ok(counts) => info!(
                available = counts.available,
                rented = counts.rented,
                inactive = counts.inactive,
                "Capacity change committed"
            ),
            Err(e) => warn!(error = %e, kind = ?e.kind(), "Capacity change rolled back"),
        }
        result
    }

    async fn resize_in_unit_of_work(
        &self,
        movie_id: &MovieId,
        target: i64,
    ) -> RentalResult<CopyCounts> {
        let mut tx = self.db.begin().await?;

        let movie = MovieRepository::get(&mut tx, movie_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Movie", movie_id.as_str()))?;

        if !movie.is_active {
            let counts = CopyPool::counts(&mut tx, movie_id).await?;
            if target > counts.in_service() {
                return Err(CoreError::conflict(format!(
                    "movie {movie_id} is inactive, reactivate it before adding copies"
                ))
                .into());
            }
        }

        let counts = CopyPool::resize_toward(&mut tx, movie_id, target).await?;

        Database::commit(tx).await?;
        Ok(counts)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, RentalError};
    use crate::service::{testing, RentalCoordinator};
    use chrono::{Duration, Utc};
    use cinerent_core::{CopyState, MAX_COPIES_PER_MOVIE};

    fn adjuster(db: &Database) -> CapacityAdjuster {
        CapacityAdjuster::new(db.clone(), RentalConfig::default())
    }

    async fn rent_one(db: &Database, movie: &MovieId) {
        let user = testing::user(db, 10_000).await;
        RentalCoordinator::new(db.clone(), RentalConfig::default())
            .rent(&user, movie, Utc::now().date_naive() + Duration::days(2))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_grow_reactivates_before_minting() {
        let db = testing::database().await;
        let movie = testing::movie(&db, Some(300), 3).await;
        rent_one(&db, &movie).await;
        {
            let mut conn = db.pool().acquire().await.unwrap();
            CopyPool::insert_copies(&mut conn, &movie, 1, CopyState::Inactive)
                .await
                .unwrap();
        }

        let counts = adjuster(&db).set_capacity(&movie, 5).await.unwrap();

        assert_eq!(counts, CopyCounts::new(4, 1, 0));
        assert_eq!(counts.total, 5);
    }

    #[tokio::test]
    async fn test_shrink_below_rented_changes_nothing() {
        let db = testing::database().await;
        let movie = testing::movie(&db, Some(300), 2).await;
        rent_one(&db, &movie).await;
        rent_one(&db, &movie).await;

        let err = adjuster(&db).set_capacity(&movie, 1).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Capacity);
        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(
            CopyPool::counts(&mut conn, &movie).await.unwrap(),
            CopyCounts::new(0, 2, 0)
        );
    }

    #[tokio::test]
    async fn test_shrink_to_zero_available() {
        let db = testing::database().await;
        let movie = testing::movie(&db, Some(300), 4).await;
        rent_one(&db, &movie).await;

        let counts = adjuster(&db).set_capacity(&movie, 1).await.unwrap();
        assert_eq!(counts, CopyCounts::new(0, 1, 3));

        // Copies are relabeled, never deleted
        assert_eq!(counts.total, 4);
    }

    #[tokio::test]
    async fn test_unchanged_target() {
        let db = testing::database().await;
        let movie = testing::movie(&db, Some(300), 2).await;

        let counts = adjuster(&db).set_capacity(&movie, 2).await.unwrap();
        assert_eq!(counts, CopyCounts::new(2, 0, 0));
    }

    #[tokio::test]
    async fn test_target_out_of_range() {
        let db = testing::database().await;
        let movie = testing::movie(&db, Some(300), 2).await;

        for target in [-1, MAX_COPIES_PER_MOVIE + 1] {
            let err = adjuster(&db).set_capacity(&movie, target).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn test_unknown_movie() {
        let db = testing::database().await;
        let err = adjuster(&db)
            .set_capacity(&MovieId::generate(), 3)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RentalError::Core(CoreError::NotFound { entity: "Movie", .. })
        ));
    }

    #[tokio::test]
    async fn test_inactive_movie_cannot_grow() {
        let db = testing::database().await;
        let movie = testing::movie(&db, Some(300), 2).await;
        {
            let mut conn = db.pool().acquire().await.unwrap();
            MovieRepository::set_active(&mut conn, &movie, false)
                .await
                .unwrap();
        }

        let err = adjuster(&db).set_capacity(&movie, 5).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
