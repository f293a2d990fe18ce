//! # Movie Repository
//!
//! Reads and flag changes on the `movies` table. Creating titles belongs to
//! the catalogue admin surface; `insert` exists for that surface, the seed
//! tool and tests.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbResult, RentalResult};
use cinerent_core::validation::validate_price_cents;
use cinerent_core::{Movie, MovieId};

#[derive(Debug, sqlx::FromRow)]
struct MovieRow {
    id: String,
    title: String,
    price_cents: Option<i64>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<MovieRow> for Movie {
    fn from(row: MovieRow) -> Self {
        Movie {
            id: MovieId::new(row.id),
            title: row.title,
            price_cents: row.price_cents,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// Repository for movie rows.
///
/// Stateless: every function takes the connection (usually a unit of work)
/// it runs on.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovieRepository;

impl MovieRepository {
    /// Inserts an active movie. A present price must be non-negative.
    pub async fn insert(
        conn: &mut SqliteConnection,
        title: &str,
        price_cents: Option<i64>,
    ) -> RentalResult<Movie> {
        if let Some(cents) = price_cents {
            validate_price_cents(cents)?;
        }

        let movie = Movie {
            id: MovieId::generate(),
            title: title.to_string(),
            price_cents,
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(id = %movie.id, title = %movie.title, "Inserting movie");

        sqlx::query(
            "INSERT INTO movies (id, title, price_cents, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(movie.id.as_str())
        .bind(&movie.title)
        .bind(movie.price_cents)
        .bind(movie.is_active)
        .bind(movie.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(movie)
    }

    /// Gets a movie by ID, active or not.
    pub async fn get(conn: &mut SqliteConnection, id: &MovieId) -> DbResult<Option<Movie>> {
        debug!(id = %id, "Getting movie");

        let row = sqlx::query_as::<_, MovieRow>(
            "SELECT id, title, price_cents, is_active, created_at
             FROM movies
             WHERE id = ?1",
        )
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(Movie::from))
    }

    /// Sets the active flag. Returns `false` if the movie does not exist.
    pub async fn set_active(
        conn: &mut SqliteConnection,
        id: &MovieId,
        active: bool,
    ) -> DbResult<bool> {
        debug!(id = %id, active, "Setting movie active flag");

        let result = sqlx::query("UPDATE movies SET is_active = ?1 WHERE id = ?2")
            .bind(active)
            .bind(id.as_str())
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Sets or clears the rental price. Returns `false` if the movie does
    /// not exist.
    pub async fn set_price(
        conn: &mut SqliteConnection,
        id: &MovieId,
        price_cents: Option<i64>,
    ) -> RentalResult<bool> {
        if let Some(cents) = price_cents {
            validate_price_cents(cents)?;
        }

        debug!(id = %id, ?price_cents, "Setting movie price");

        let result = sqlx::query("UPDATE movies SET price_cents = ?1 WHERE id = ?2")
            .bind(price_cents)
            .bind(id.as_str())
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let movie = MovieRepository::insert(&mut conn, "Alien", Some(350))
            .await
            .unwrap();
        let loaded = MovieRepository::get(&mut conn, &movie.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(loaded.title, "Alien");
        assert_eq!(loaded.price_cents, Some(350));
        assert!(loaded.is_active);
    }

    #[tokio::test]
    async fn test_flags_on_missing_movie() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let missing = MovieId::generate();

        assert!(MovieRepository::get(&mut conn, &missing).await.unwrap().is_none());
        assert!(!MovieRepository::set_active(&mut conn, &missing, false)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_clear_price() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let movie = MovieRepository::insert(&mut conn, "Solaris", Some(200))
            .await
            .unwrap();
        assert!(MovieRepository::set_price(&mut conn, &movie.id, None)
            .await
            .unwrap());

        let loaded = MovieRepository::get(&mut conn, &movie.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.price(), None);
    }

    #[tokio::test]
    async fn test_negative_price_is_rejected_before_writing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let err = MovieRepository::insert(&mut conn, "Heat", Some(-1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let movies: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movies")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(movies, 0);

        let movie = MovieRepository::insert(&mut conn, "Heat", Some(0))
            .await
            .unwrap();
        let err = MovieRepository::set_price(&mut conn, &movie.id, Some(-50))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let loaded = MovieRepository::get(&mut conn, &movie.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.price_cents, Some(0));
    }
}
