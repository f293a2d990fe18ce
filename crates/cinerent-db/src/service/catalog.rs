//! # Catalog Coordinator
//!
//! Movie deactivation and reactivation, plus the read-side queries the
//! listing pages need from the rental core.
//!
//! ## Deactivation
//! ```text
//! deactivate_movie(movie)
//!      ├── movie missing or has no copies   → NotFound
//!      ├── any copy rented                  → Conflict ("has active rentals")
//!      ▼
//! available → inactive (all), movie.is_active = false     ← one unit of work
//!
//! reactivate_movie(movie)
//!      ├── movie missing                    → NotFound
//!      ▼
//! inactive → available (all), movie.is_active = true
//! ```

use tracing::{debug, info, instrument, warn};

use crate::config::RentalConfig;
use crate::error::RentalResult;
use crate::pool::Database;
use crate::repository::{CopyPool, Ledger, MovieRepository, RentalRepository};
use crate::service::within;
use cinerent_core::{CopyCounts, CopyState, CoreError, Money, MovieId, RentalSummary, UserId};

/// Catalogue-level operations on movies and rental history.
#[derive(Debug, Clone)]
pub struct CatalogCoordinator {
    db: Database,
    config: RentalConfig,
}

impl CatalogCoordinator {
    pub fn new(db: Database, config: RentalConfig) -> Self {
        CatalogCoordinator { db, config }
    }

    // =========================================================================
    // Activation
    // =========================================================================

    /// Takes a movie out of circulation. Every copy ends up `inactive`.
    #[instrument(skip(self))]
    pub async fn deactivate_movie(&self, movie_id: &MovieId) -> RentalResult<CopyCounts> {
        let result = within(
            self.config.unit_of_work_timeout,
            self.deactivate_in_unit_of_work(movie_id),
        )
        .await;

        match &result {
            Ok(counts) => info!(inactive = counts.inactive, "Movie deactivated"),
            Err(e) => warn!(error = %e, "Deactivation rolled back"),
        }
        result
    }

    /// Puts a movie back in circulation. Retired copies become `available`.
    #[instrument(skip(self))]
    pub async fn reactivate_movie(&self, movie_id: &MovieId) -> RentalResult<CopyCounts> {
        let result = within(
            self.config.unit_of_work_timeout,
            self.reactivate_in_unit_of_work(movie_id),
        )
        .await;

        match &result {
            Ok(counts) => info!(available = counts.available, "Movie reactivated"),
            Err(e) => warn!(error = %e, "Reactivation rolled back"),
        }
        result
    }

    async fn deactivate_in_unit_of_work(&self, movie_id: &MovieId) -> RentalResult<CopyCounts> {
        let mut tx = self.db.begin().await?;

        if MovieRepository::get(&mut tx, movie_id).await?.is_none() {
            return Err(CoreError::not_found("Movie", movie_id.as_str()).into());
        }

        let counts = CopyPool::counts(&mut tx, movie_id).await?;
        if counts.total == 0 {
            return Err(CoreError::not_found("Copies of movie", movie_id.as_str()).into());
        }
        if counts.rented > 0 {
            return Err(CoreError::conflict(format!(
                "movie {movie_id} has active rentals ({} copies out)",
                counts.rented
            ))
            .into());
        }

        CopyPool::relabel_all(&mut tx, movie_id, CopyState::Available, CopyState::Inactive)
            .await?;
        MovieRepository::set_active(&mut tx, movie_id, false).await?;
        let counts = CopyPool::counts(&mut tx, movie_id).await?;

        Database::commit(tx).await?;
        Ok(counts)
    }

    async fn reactivate_in_unit_of_work(&self, movie_id: &MovieId) -> RentalResult<CopyCounts> {
        let mut tx = self.db.begin().await?;

        if !MovieRepository::set_active(&mut tx, movie_id, true).await? {
            return Err(CoreError::not_found("Movie", movie_id.as_str()).into());
        }
        CopyPool::relabel_all(&mut tx, movie_id, CopyState::Inactive, CopyState::Available)
            .await?;
        let counts = CopyPool::counts(&mut tx, movie_id).await?;

        Database::commit(tx).await?;
        Ok(counts)
    }

    // =========================================================================
    // Read-side queries
    // =========================================================================

    /// Per-state copy counts for a movie.
    pub async fn copy_counts(&self, movie_id: &MovieId) -> RentalResult<CopyCounts> {
        within(self.config.unit_of_work_timeout, self.load_counts(movie_id)).await
    }

    /// The user's rentals with movie titles, newest first.
    pub async fn rentals_for_user(&self, user_id: &UserId) -> RentalResult<Vec<RentalSummary>> {
        within(self.config.unit_of_work_timeout, self.load_history(user_id)).await
    }

    /// Everything the user has paid for rentals so far.
    pub async fn total_paid_by_user(&self, user_id: &UserId) -> RentalResult<Money> {
        within(self.config.unit_of_work_timeout, self.load_total_paid(user_id)).await
    }

    async fn load_counts(&self, movie_id: &MovieId) -> RentalResult<CopyCounts> {
        let mut conn = self.db.pool().acquire().await?;
        if MovieRepository::get(&mut conn, movie_id).await?.is_none() {
            return Err(CoreError::not_found("Movie", movie_id.as_str()).into());
        }
        Ok(CopyPool::counts(&mut conn, movie_id).await?)
    }

    async fn load_history(&self, user_id: &UserId) -> RentalResult<Vec<RentalSummary>> {
        let mut conn = self.db.pool().acquire().await?;
        if Ledger::get_user(&mut conn, user_id).await?.is_none() {
            return Err(CoreError::not_found("User", user_id.as_str()).into());
        }
        let rentals = RentalRepository::for_user(&mut conn, user_id).await?;
        debug!(user_id = %user_id, count = rentals.len(), "Loaded rental history");
        Ok(rentals)
    }

    async fn load_total_paid(&self, user_id: &UserId) -> RentalResult<Money> {
        let mut conn = self.db.pool().acquire().await?;
        if Ledger::get_user(&mut conn, user_id).await?.is_none() {
            return Err(CoreError::not_found("User", user_id.as_str()).into());
        }
        Ok(RentalRepository::total_paid_by_user(&mut conn, user_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::service::{testing, CapacityAdjuster, RentalCoordinator, ReturnCoordinator};
    use chrono::{Duration, Utc};

    fn catalog(db: &Database) -> CatalogCoordinator {
        CatalogCoordinator::new(db.clone(), RentalConfig::default())
    }

    fn rentals(db: &Database) -> RentalCoordinator {
        RentalCoordinator::new(db.clone(), RentalConfig::default())
    }

    fn in_two_days() -> chrono::NaiveDate {
        Utc::now().date_naive() + Duration::days(2)
    }

    #[tokio::test]
    async fn test_deactivate_and_reactivate() {
        let db = testing::database().await;
        let movie = testing::movie(&db, Some(300), 3).await;

        let counts = catalog(&db).deactivate_movie(&movie).await.unwrap();
        assert_eq!(counts, CopyCounts::new(0, 0, 3));

        let user = testing::user(&db, 1000).await;
        let err = rentals(&db)
            .rent(&user, &movie, in_two_days())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfStock);

        let counts = catalog(&db).reactivate_movie(&movie).await.unwrap();
        assert_eq!(counts, CopyCounts::new(3, 0, 0));
        rentals(&db).rent(&user, &movie, in_two_days()).await.unwrap();
    }

    #[tokio::test]
    async fn test_deactivate_with_active_rentals() {
        let db = testing::database().await;
        let movie = testing::movie(&db, Some(300), 2).await;
        let user = testing::user(&db, 1000).await;
        rentals(&db).rent(&user, &movie, in_two_days()).await.unwrap();

        let err = catalog(&db).deactivate_movie(&movie).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // Nothing changed
        let counts = catalog(&db).copy_counts(&movie).await.unwrap();
        assert_eq!(counts, CopyCounts::new(1, 1, 0));
        let mut conn = db.pool().acquire().await.unwrap();
        assert!(MovieRepository::get(&mut conn, &movie)
            .await
            .unwrap()
            .unwrap()
            .is_active);
    }

    #[tokio::test]
    async fn test_deactivate_without_copies() {
        let db = testing::database().await;
        let movie = testing::movie(&db, Some(300), 0).await;

        let err = catalog(&db).deactivate_movie(&movie).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = catalog(&db)
            .deactivate_movie(&MovieId::generate())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_reactivate_unknown_movie() {
        let db = testing::database().await;
        let err = catalog(&db)
            .reactivate_movie(&MovieId::generate())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_counts_stay_conserved() {
        let db = testing::database().await;
        let movie = testing::movie(&db, Some(300), 3).await;
        let user = testing::user(&db, 10_000).await;
        let config = RentalConfig::default();

        let rental = rentals(&db).rent(&user, &movie, in_two_days()).await.unwrap();
        CapacityAdjuster::new(db.clone(), config.clone())
            .set_capacity(&movie, 6)
            .await
            .unwrap();
        CapacityAdjuster::new(db.clone(), config.clone())
            .set_capacity(&movie, 2)
            .await
            .unwrap();
        ReturnCoordinator::new(db.clone(), config)
            .return_copy(&rental.copy_id)
            .await
            .unwrap();

        let counts = catalog(&db).copy_counts(&movie).await.unwrap();
        assert_eq!(counts.total, 6);
        assert_eq!(counts.available + counts.rented + counts.inactive, 6);
    }

    #[tokio::test]
    async fn test_history_and_totals() {
        let db = testing::database().await;
        let movie = testing::movie(&db, Some(300), 2).await;
        let user = testing::user(&db, 1000).await;

        rentals(&db).rent(&user, &movie, in_two_days()).await.unwrap();
        rentals(&db).rent(&user, &movie, in_two_days()).await.unwrap();

        let history = catalog(&db).rentals_for_user(&user).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|r| r.title == "Alien"));

        let paid = catalog(&db).total_paid_by_user(&user).await.unwrap();
        assert_eq!(paid, Money::from_cents(600));
        assert_eq!(
            paid + testing::balance(&db, &user).await,
            Money::from_cents(1000)
        );
    }

    #[tokio::test]
    async fn test_queries_for_unknown_entities() {
        let db = testing::database().await;

        let err = catalog(&db)
            .rentals_for_user(&UserId::generate())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = catalog(&db)
            .copy_counts(&MovieId::generate())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
