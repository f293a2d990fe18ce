//! # Rental Repository
//!
//! Rental and payment records.
//!
//! ## Record Lifecycle
//! ```text
//! rent ──► INSERT rentals (status = 'active')
//!          INSERT payments (rental_id, amount)       ← same unit of work
//!
//! return ──► UPDATE rentals SET status = 'returned', returned_at = now
//!            WHERE product_id = ? AND status = 'active'
//! ```
//!
//! A returned rental is never touched again and payments are never updated
//! or deleted. The partial unique index on `rentals(product_id)` guarantees
//! at most one active rental per copy.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use cinerent_core::{
    CopyId, Money, MovieId, Payment, PaymentId, Rental, RentalId, RentalStatus, RentalSummary,
    UserId,
};

#[derive(Debug, sqlx::FromRow)]
struct RentalRow {
    id: String,
    user_id: String,
    product_id: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: RentalStatus,
    created_at: DateTime<Utc>,
    returned_at: Option<DateTime<Utc>>,
}

impl From<RentalRow> for Rental {
    fn from(row: RentalRow) -> Self {
        Rental {
            id: RentalId::new(row.id),
            user_id: UserId::new(row.user_id),
            copy_id: CopyId::new(row.product_id),
            start_date: row.start_date,
            end_date: row.end_date,
            status: row.status,
            created_at: row.created_at,
            returned_at: row.returned_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    rental: RentalRow,
    movie_id: String,
    title: String,
    amount_cents: i64,
}

impl From<SummaryRow> for RentalSummary {
    fn from(row: SummaryRow) -> Self {
        RentalSummary {
            rental: row.rental.into(),
            movie_id: MovieId::new(row.movie_id),
            title: row.title,
            amount_cents: row.amount_cents,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: String,
    rental_id: String,
    amount_cents: i64,
    paid_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: PaymentId::new(row.id),
            rental_id: RentalId::new(row.rental_id),
            amount_cents: row.amount_cents,
            paid_at: row.paid_at,
        }
    }
}

const RENTAL_COLUMNS: &str =
    "r.id, r.user_id, r.product_id, r.start_date, r.end_date, r.status, r.created_at, r.returned_at";

/// Repository for rentals and their payments.
#[derive(Debug, Clone, Copy, Default)]
pub struct RentalRepository;

impl RentalRepository {
    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts an active rental of `copy_id` by `user_id`.
    pub async fn insert_rental(
        conn: &mut SqliteConnection,
        user_id: &UserId,
        copy_id: &CopyId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> DbResult<Rental> {
        let rental = Rental {
            id: RentalId::generate(),
            user_id: user_id.clone(),
            copy_id: copy_id.clone(),
            start_date,
            end_date,
            status: RentalStatus::Active,
            created_at: Utc::now(),
            returned_at: None,
        };

        debug!(
            id = %rental.id,
            user_id = %user_id,
            copy_id = %copy_id,
            %end_date,
            "Inserting rental"
        );

        sqlx::query(
            "INSERT INTO rentals (id, user_id, product_id, start_date, end_date, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(rental.id.as_str())
        .bind(user_id.as_str())
        .bind(copy_id.as_str())
        .bind(rental.start_date)
        .bind(rental.end_date)
        .bind(rental.status)
        .bind(rental.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(rental)
    }

    /// Records the payment for a rental.
    pub async fn insert_payment(
        conn: &mut SqliteConnection,
        rental_id: &RentalId,
        amount: Money,
    ) -> DbResult<Payment> {
        let payment = Payment {
            id: PaymentId::generate(),
            rental_id: rental_id.clone(),
            amount_cents: amount.cents(),
            paid_at: Utc::now(),
        };

        debug!(id = %payment.id, rental_id = %rental_id, %amount, "Inserting payment");

        sqlx::query(
            "INSERT INTO payments (id, rental_id, amount_cents, paid_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(payment.id.as_str())
        .bind(rental_id.as_str())
        .bind(payment.amount_cents)
        .bind(payment.paid_at)
        .execute(&mut *conn)
        .await?;

        Ok(payment)
    }

    /// Closes the active rental of a copy, if there is one.
    ///
    /// Returns the closed rental's ID, or `None` when the copy had no
    /// active rental.
    pub async fn close_active(
        conn: &mut SqliteConnection,
        copy_id: &CopyId,
    ) -> DbResult<Option<RentalId>> {
        debug!(copy_id = %copy_id, "Closing active rental");

        let id: Option<String> = sqlx::query_scalar(
            "UPDATE rentals SET status = 'returned', returned_at = ?1
             WHERE product_id = ?2 AND status = 'active'
             RETURNING id",
        )
        .bind(Utc::now())
        .bind(copy_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        Ok(id.map(RentalId::new))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a rental by ID.
    pub async fn get(conn: &mut SqliteConnection, id: &RentalId) -> DbResult<Option<Rental>> {
        let sql = format!("SELECT {RENTAL_COLUMNS} FROM rentals r WHERE r.id = ?1");
        let row = sqlx::query_as::<_, RentalRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row.map(Rental::from))
    }

    /// The active rental pinning a copy, if any.
    pub async fn find_active_by_copy(
        conn: &mut SqliteConnection,
        copy_id: &CopyId,
    ) -> DbResult<Option<Rental>> {
        let sql = format!(
            "SELECT {RENTAL_COLUMNS} FROM rentals r
             WHERE r.product_id = ?1 AND r.status = 'active'"
        );
        let row = sqlx::query_as::<_, RentalRow>(&sql)
            .bind(copy_id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row.map(Rental::from))
    }

    /// The payment recorded with a rental.
    pub async fn payment_for(
        conn: &mut SqliteConnection,
        rental_id: &RentalId,
    ) -> DbResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, rental_id, amount_cents, paid_at FROM payments WHERE rental_id = ?1",
        )
        .bind(rental_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(Payment::from))
    }

    /// A user's rentals with the movie title and amount paid, newest first.
    pub async fn for_user(
        conn: &mut SqliteConnection,
        user_id: &UserId,
    ) -> DbResult<Vec<RentalSummary>> {
        debug!(user_id = %user_id, "Listing rentals for user");

        let sql = format!(
            "SELECT {RENTAL_COLUMNS},
                    m.id AS movie_id,
                    m.title AS title,
                    COALESCE(pay.amount_cents, 0) AS amount_cents
             FROM rentals r
             INNER JOIN products p ON p.id = r.product_id
             INNER JOIN movies m ON m.id = p.movie_id
             LEFT JOIN payments pay ON pay.rental_id = r.id
             WHERE r.user_id = ?1
             ORDER BY r.created_at DESC, r.id DESC"
        );
        let rows = sqlx::query_as::<_, SummaryRow>(&sql)
            .bind(user_id.as_str())
            .fetch_all(&mut *conn)
            .await?;

        debug!(count = rows.len(), "Listed rentals");
        Ok(rows.into_iter().map(RentalSummary::from).collect())
    }

    /// Sum of every payment made for the user's rentals.
    pub async fn total_paid_by_user(
        conn: &mut SqliteConnection,
        user_id: &UserId,
    ) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(pay.amount_cents), 0)
             FROM payments pay
             INNER JOIN rentals r ON r.id = pay.rental_id
             WHERE r.user_id = ?1",
        )
        .bind(user_id.as_str())
        .fetch_one(&mut *conn)
        .await?;

        Ok(Money::from_cents(cents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use crate::repository::{CopyPool, Ledger, MovieRepository};
    use cinerent_core::CopyState;
    use sqlx::pool::PoolConnection;
    use sqlx::Sqlite;

    struct Fixture {
        _db: Database,
        conn: PoolConnection<Sqlite>,
        user: UserId,
        copy: CopyId,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let movie = MovieRepository::insert(&mut conn, "Stalker", Some(250))
            .await
            .unwrap();
        let copy = CopyPool::insert_copies(&mut conn, &movie.id, 1, CopyState::Available)
            .await
            .unwrap()
            .remove(0);
        let user = Ledger::insert_user(&mut conn, "ana", Money::from_cents(1000))
            .await
            .unwrap();
        Fixture {
            _db: db,
            conn,
            user: user.id,
            copy,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_close() {
        let mut f = fixture().await;

        let rental =
            RentalRepository::insert_rental(&mut f.conn, &f.user, &f.copy, day(1), day(4))
                .await
                .unwrap();
        RentalRepository::insert_payment(&mut f.conn, &rental.id, Money::from_cents(250))
            .await
            .unwrap();

        let active = RentalRepository::find_active_by_copy(&mut f.conn, &f.copy)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.id, rental.id);

        let closed = RentalRepository::close_active(&mut f.conn, &f.copy)
            .await
            .unwrap();
        assert_eq!(closed, Some(rental.id.clone()));

        let loaded = RentalRepository::get(&mut f.conn, &rental.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.status, RentalStatus::Returned);
        assert!(loaded.returned_at.is_some());

        // Nothing left to close
        assert_eq!(
            RentalRepository::close_active(&mut f.conn, &f.copy)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_one_active_rental_per_copy() {
        let mut f = fixture().await;

        RentalRepository::insert_rental(&mut f.conn, &f.user, &f.copy, day(1), day(4))
            .await
            .unwrap();
        let err = RentalRepository::insert_rental(&mut f.conn, &f.user, &f.copy, day(1), day(4))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_end_before_start_is_rejected() {
        let mut f = fixture().await;

        let err = RentalRepository::insert_rental(&mut f.conn, &f.user, &f.copy, day(4), day(1))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_summaries_and_totals() {
        let mut f = fixture().await;

        let first =
            RentalRepository::insert_rental(&mut f.conn, &f.user, &f.copy, day(1), day(2))
                .await
                .unwrap();
        RentalRepository::insert_payment(&mut f.conn, &first.id, Money::from_cents(250))
            .await
            .unwrap();
        RentalRepository::close_active(&mut f.conn, &f.copy)
            .await
            .unwrap();

        let second =
            RentalRepository::insert_rental(&mut f.conn, &f.user, &f.copy, day(3), day(5))
                .await
                .unwrap();
        RentalRepository::insert_payment(&mut f.conn, &second.id, Money::from_cents(300))
            .await
            .unwrap();

        let summaries = RentalRepository::for_user(&mut f.conn, &f.user)
            .await
            .unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].rental.id, second.id);
        assert_eq!(summaries[0].title, "Stalker");
        assert_eq!(summaries[0].amount_cents, 300);
        assert_eq!(summaries[1].rental.status, RentalStatus::Returned);

        let total = RentalRepository::total_paid_by_user(&mut f.conn, &f.user)
            .await
            .unwrap();
        assert_eq!(total, Money::from_cents(550));

        let payment = RentalRepository::payment_for(&mut f.conn, &first.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.amount(), Money::from_cents(250));
    }

    #[tokio::test]
    async fn test_totals_for_user_without_rentals() {
        let mut f = fixture().await;
        let total = RentalRepository::total_paid_by_user(&mut f.conn, &UserId::generate())
            .await
            .unwrap();
        assert_eq!(total, Money::zero());
    }
}
