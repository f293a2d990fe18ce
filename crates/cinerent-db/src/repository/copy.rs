//! # Copy Pool
//!
//! The rentable copies ("products") of each movie and their state
//! transitions.
//!
//! ## Conditional Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Every transition names the state it expects             │
//! │                                                                         │
//! │  UPDATE products SET state = 'rented'                                  │
//! │  WHERE id = ?1 AND state = 'available'                                 │
//! │       │                                                                 │
//! │       ├── 1 row  → transition happened                                 │
//! │       │                                                                 │
//! │       └── 0 rows → look the copy up again:                             │
//! │                    missing       → NotFound                            │
//! │                    other state   → InvalidTransition (someone else     │
//! │                                    moved it first)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No transition here blindly overwrites a state it did not check. The pure
//! rules (which transitions are legal, how a resize is planned) live in
//! `cinerent_core::inventory`.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbResult, RentalError, RentalResult};
use cinerent_core::inventory::check_set_state;
use cinerent_core::{
    plan_resize, CopyCounts, CopyId, CopyState, CoreError, MovieCopy, MovieId, ResizePlan,
};

#[derive(Debug, sqlx::FromRow)]
struct CopyRow {
    id: String,
    movie_id: String,
    state: CopyState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CopyRow> for MovieCopy {
    fn from(row: CopyRow) -> Self {
        MovieCopy {
            id: CopyId::new(row.id),
            movie_id: MovieId::new(row.movie_id),
            state: row.state,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for copy rows and their lifecycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyPool;

impl CopyPool {
    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a copy by ID.
    pub async fn get(conn: &mut SqliteConnection, id: &CopyId) -> DbResult<Option<MovieCopy>> {
        debug!(id = %id, "Getting copy");

        let row = sqlx::query_as::<_, CopyRow>(
            "SELECT id, movie_id, state, created_at, updated_at
             FROM products
             WHERE id = ?1",
        )
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(MovieCopy::from))
    }

    /// Selects one `available` copy of the movie.
    ///
    /// Oldest copy first, ties broken by id, so two callers inside the same
    /// snapshot pick the same copy and the loser's `reserve` fails instead
    /// of both silently succeeding on different rows.
    pub async fn find_available(
        conn: &mut SqliteConnection,
        movie_id: &MovieId,
    ) -> DbResult<Option<CopyId>> {
        debug!(movie_id = %movie_id, "Looking for an available copy");

        let id: Option<String> = sqlx::query_scalar(
            "SELECT id FROM products
             WHERE movie_id = ?1 AND state = 'available'
             ORDER BY created_at, id
             LIMIT 1",
        )
        .bind(movie_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        Ok(id.map(CopyId::new))
    }

    /// Lists every copy of the movie, oldest first.
    pub async fn list(conn: &mut SqliteConnection, movie_id: &MovieId) -> DbResult<Vec<MovieCopy>> {
        let rows = sqlx::query_as::<_, CopyRow>(
            "SELECT id, movie_id, state, created_at, updated_at
             FROM products
             WHERE movie_id = ?1
             ORDER BY created_at, id",
        )
        .bind(movie_id.as_str())
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(MovieCopy::from).collect())
    }

    /// Counts the movie's copies per state.
    pub async fn counts(conn: &mut SqliteConnection, movie_id: &MovieId) -> DbResult<CopyCounts> {
        let rows: Vec<(CopyState, i64)> = sqlx::query_as(
            "SELECT state, COUNT(*) FROM products
             WHERE movie_id = ?1
             GROUP BY state",
        )
        .bind(movie_id.as_str())
        .fetch_all(&mut *conn)
        .await?;

        let mut counts = CopyCounts::default();
        for (state, n) in rows {
            counts.record(state, n);
        }

        debug!(movie_id = %movie_id, ?counts, "Counted copies");
        Ok(counts)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// `available -> rented`.
    pub async fn reserve(conn: &mut SqliteConnection, id: &CopyId) -> RentalResult<()> {
        debug!(id = %id, "Reserving copy");

        let changed = Self::transition(conn, id, CopyState::Available, CopyState::Rented).await?;
        if !changed {
            return Err(Self::rejected(conn, id, CopyState::Rented).await);
        }
        Ok(())
    }

    /// `rented -> available` if the movie is active, `rented -> inactive`
    /// otherwise. Returns the state the copy ended in.
    pub async fn release(
        conn: &mut SqliteConnection,
        id: &CopyId,
        movie_active: bool,
    ) -> RentalResult<CopyState> {
        let to = CopyState::released(movie_active);
        debug!(id = %id, to = %to, "Releasing copy");

        let changed = Self::transition(conn, id, CopyState::Rented, to).await?;
        if !changed {
            return Err(Self::rejected(conn, id, to).await);
        }
        Ok(to)
    }

    /// Direct transition used for capacity changes. Never moves a copy into
    /// or out of `rented`; setting a copy to the state it is in is a no-op.
    pub async fn set_state(
        conn: &mut SqliteConnection,
        id: &CopyId,
        to: CopyState,
    ) -> RentalResult<()> {
        let copy = Self::get(conn, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Copy", id.as_str()))?;

        check_set_state(id.as_str(), copy.state, to)?;
        if copy.state == to {
            return Ok(());
        }

        debug!(id = %id, from = %copy.state, to = %to, "Setting copy state");

        let changed = Self::transition(conn, id, copy.state, to).await?;
        if !changed {
            return Err(Self::rejected(conn, id, to).await);
        }
        Ok(())
    }

    async fn transition(
        conn: &mut SqliteConnection,
        id: &CopyId,
        from: CopyState,
        to: CopyState,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE products SET state = ?1, updated_at = ?2
             WHERE id = ?3 AND state = ?4",
        )
        .bind(to)
        .bind(Utc::now())
        .bind(id.as_str())
        .bind(from)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Explains why a conditional update touched nothing.
    async fn rejected(
        conn: &mut SqliteConnection,
        id: &CopyId,
        to: CopyState,
    ) -> RentalError {
        match Self::get(conn, id).await {
            Ok(Some(copy)) => CoreError::InvalidTransition {
                copy_id: id.to_string(),
                from: copy.state,
                to,
            }
            .into(),
            Ok(None) => CoreError::not_found("Copy", id.as_str()).into(),
            Err(e) => e.into(),
        }
    }

    // =========================================================================
    // Bulk operations
    // =========================================================================

    /// Mints `n` new copies of the movie in `state`.
    pub async fn insert_copies(
        conn: &mut SqliteConnection,
        movie_id: &MovieId,
        n: i64,
        state: CopyState,
    ) -> DbResult<Vec<CopyId>> {
        debug!(movie_id = %movie_id, n, state = %state, "Creating copies");

        let now = Utc::now();
        let mut ids = Vec::with_capacity(n.max(0) as usize);
        for _ in 0..n {
            let id = CopyId::generate();
            sqlx::query(
                "INSERT INTO products (id, movie_id, state, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
            )
            .bind(id.as_str())
            .bind(movie_id.as_str())
            .bind(state)
            .bind(now)
            .execute(&mut *conn)
            .await?;
            ids.push(id);
        }

        Ok(ids)
    }

    /// Moves up to `limit` of the movie's copies from `from` to `to`.
    ///
    /// Oldest copies are picked first when reactivating and newest first
    /// when retiring, so the long-lived copies stay in service.
    async fn relabel(
        conn: &mut SqliteConnection,
        movie_id: &MovieId,
        from: CopyState,
        to: CopyState,
        limit: i64,
    ) -> DbResult<u64> {
        let order = if to == CopyState::Inactive {
            "created_at DESC, id DESC"
        } else {
            "created_at, id"
        };

        // Only the ORDER BY direction is interpolated, and it is one of two
        // literals above; every value is bound.
        let sql = format!(
            "UPDATE products SET state = ?1, updated_at = ?2
             WHERE id IN (
                 SELECT id FROM products
                 WHERE movie_id = ?3 AND state = ?4
                 ORDER BY {order}
                 LIMIT ?5
             )"
        );

        let result = sqlx::query(&sql)
            .bind(to)
            .bind(Utc::now())
            .bind(movie_id.as_str())
            .bind(from)
            .bind(limit)
            .execute(&mut *conn)
            .await?;

        debug!(
            movie_id = %movie_id,
            from = %from,
            to = %to,
            moved = result.rows_affected(),
            "Relabeled copies"
        );
        Ok(result.rows_affected())
    }

    /// Relabels every copy of the movie in `from` to `to`. Rented copies
    /// are never touched because callers only pass the other two states.
    pub async fn relabel_all(
        conn: &mut SqliteConnection,
        movie_id: &MovieId,
        from: CopyState,
        to: CopyState,
    ) -> RentalResult<u64> {
        check_set_state("*", from, to)?;
        Ok(Self::relabel(conn, movie_id, from, to, -1).await?)
    }

    /// Grows or shrinks the movie's in-service copies to `target`.
    ///
    /// ## Grow
    /// Reactivates `inactive` copies first, then mints new `available` ones.
    ///
    /// ## Shrink
    /// Retires `available` copies only. Fails with `CapacityBelowRented`
    /// before writing anything if that is not enough.
    ///
    /// Returns the counts after the change.
    pub async fn resize_toward(
        conn: &mut SqliteConnection,
        movie_id: &MovieId,
        target: i64,
    ) -> RentalResult<CopyCounts> {
        let counts = Self::counts(conn, movie_id).await?;

        let plan = plan_resize(&counts, target).map_err(|e| match e {
            CoreError::CapacityBelowRented {
                target,
                rented,
                available,
                ..
            } => CoreError::CapacityBelowRented {
                movie_id: movie_id.to_string(),
                target,
                rented,
                available,
            },
            other => other,
        })?;

        debug!(movie_id = %movie_id, target, ?plan, "Resizing copy pool");

        match plan {
            ResizePlan::Unchanged => return Ok(counts),
            ResizePlan::Grow { reactivate, create } => {
                if reactivate > 0 {
                    let moved = Self::relabel(
                        conn,
                        movie_id,
                        CopyState::Inactive,
                        CopyState::Available,
                        reactivate,
                    )
                    .await?;
                    Self::expect_moved(movie_id, moved, reactivate)?;
                }
                if create > 0 {
                    Self::insert_copies(conn, movie_id, create, CopyState::Available).await?;
                }
            }
            ResizePlan::Shrink { retire } => {
                let moved = Self::relabel(
                    conn,
                    movie_id,
                    CopyState::Available,
                    CopyState::Inactive,
                    retire,
                )
                .await?;
                Self::expect_moved(movie_id, moved, retire)?;
            }
        }

        let after = Self::counts(conn, movie_id).await?;
        if after != plan.apply(&counts) {
            return Err(CoreError::conflict(format!(
                "copy pool of movie {movie_id} changed during resize"
            ))
            .into());
        }
        Ok(after)
    }

    fn expect_moved(movie_id: &MovieId, moved: u64, wanted: i64) -> RentalResult<()> {
        if moved as i64 != wanted {
            return Err(CoreError::conflict(format!(
                "copy pool of movie {movie_id} changed during resize"
            ))
            .into());
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
