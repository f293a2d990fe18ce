//! # Ledger
//!
//! User accounts as far as the rental core cares: who exists and how much
//! credit they hold.
//!
//! ## Compare-and-Set Debit
//! ```text
//! balance read inside the unit of work: 500
//!      │
//!      ▼
//! UPDATE users SET credit_cents = 200          ← 500 - price(300)
//! WHERE id = ?  AND credit_cents = 500         ← only if still 500
//!      │
//!      ├── 1 row  → debited
//!      └── 0 rows → balance moved underneath us → Conflict, roll back
//! ```
//!
//! Credit only ever goes down through `debit`; a return never refunds.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbResult, RentalResult};
use cinerent_core::validation::validate_credit_cents;
use cinerent_core::{CoreError, Money, User, UserId};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    credit_cents: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::new(row.id),
            name: row.name,
            credit_cents: row.credit_cents,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// Repository for user balances.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ledger;

impl Ledger {
    /// Inserts an active user with a non-negative opening balance.
    pub async fn insert_user(
        conn: &mut SqliteConnection,
        name: &str,
        credit: Money,
    ) -> RentalResult<User> {
        validate_credit_cents(credit.cents())?;

        let user = User {
            id: UserId::generate(),
            name: name.to_string(),
            credit_cents: credit.cents(),
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(id = %user.id, credit = %credit, "Inserting user");

        sqlx::query(
            "INSERT INTO users (id, name, credit_cents, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(user.id.as_str())
        .bind(&user.name)
        .bind(user.credit_cents)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(user)
    }

    /// Gets a user by ID, active or not.
    pub async fn get_user(conn: &mut SqliteConnection, id: &UserId) -> DbResult<Option<User>> {
        debug!(id = %id, "Getting user");

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, credit_cents, is_active, created_at
             FROM users
             WHERE id = ?1",
        )
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(User::from))
    }

    /// Current balance of an existing user.
    pub async fn balance(conn: &mut SqliteConnection, id: &UserId) -> RentalResult<Money> {
        let cents: Option<i64> = sqlx::query_scalar("SELECT credit_cents FROM users WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        cents
            .map(Money::from_cents)
            .ok_or_else(|| CoreError::not_found("User", id.as_str()).into())
    }

    /// Debits `price` from a balance last read as `expected`.
    ///
    /// Fails with `InsufficientCredit` when `expected` does not cover the
    /// price and with `Conflict` when the stored balance is no longer
    /// `expected`. Returns the new balance.
    pub async fn debit(
        conn: &mut SqliteConnection,
        id: &UserId,
        expected: Money,
        price: Money,
    ) -> RentalResult<Money> {
        let remaining = expected
            .debit(price)
            .ok_or_else(|| CoreError::InsufficientCredit {
                user_id: id.to_string(),
                balance: expected,
                price,
            })?;

        debug!(id = %id, %expected, %price, %remaining, "Debiting ledger");

        let result = sqlx::query(
            "UPDATE users SET credit_cents = ?1
             WHERE id = ?2 AND credit_cents = ?3",
        )
        .bind(remaining.cents())
        .bind(id.as_str())
        .bind(expected.cents())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() != 1 {
            return Err(CoreError::conflict(format!(
                "balance of user {id} changed during the rental"
            ))
            .into());
        }

        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RentalError;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_debit_to_zero() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let user = Ledger::insert_user(&mut conn, "ana", Money::from_cents(300))
            .await
            .unwrap();

        let left = Ledger::debit(&mut conn, &user.id, user.credit(), Money::from_cents(300))
            .await
            .unwrap();

        assert_eq!(left, Money::zero());
        assert_eq!(Ledger::balance(&mut conn, &user.id).await.unwrap(), left);
    }

    #[tokio::test]
    async fn test_debit_one_cent_short() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let user = Ledger::insert_user(&mut conn, "ana", Money::from_cents(299))
            .await
            .unwrap();

        let err = Ledger::debit(&mut conn, &user.id, user.credit(), Money::from_cents(300))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RentalError::Core(CoreError::InsufficientCredit { .. })
        ));
        assert_eq!(
            Ledger::balance(&mut conn, &user.id).await.unwrap(),
            Money::from_cents(299)
        );
    }

    #[tokio::test]
    async fn test_debit_with_stale_balance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let user = Ledger::insert_user(&mut conn, "ana", Money::from_cents(1000))
            .await
            .unwrap();

        Ledger::debit(&mut conn, &user.id, user.credit(), Money::from_cents(400))
            .await
            .unwrap();

        // Second debit still believes the balance is 1000
        let err = Ledger::debit(&mut conn, &user.id, user.credit(), Money::from_cents(400))
            .await
            .unwrap_err();

        assert!(matches!(err, RentalError::Core(CoreError::Conflict { .. })));
        assert_eq!(
            Ledger::balance(&mut conn, &user.id).await.unwrap(),
            Money::from_cents(600)
        );
    }

    #[tokio::test]
    async fn test_balance_of_missing_user() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let err = Ledger::balance(&mut conn, &UserId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, RentalError::Core(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_negative_opening_balance_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let err = Ledger::insert_user(&mut conn, "ana", Money::from_cents(-1))
            .await
            .unwrap_err();
        assert!(matches!(err, RentalError::Core(CoreError::Validation(_))));

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(users, 0);
    }
}
