//! Repository for the `user_coins` table and cross-table ledger transfers.

use sleuth_core::store::LedgerTransfer;
use sleuth_core::types::UserId;
use sqlx::PgPool;

use crate::models::coin::CoinBalanceRow;

const COLUMNS: &str = "user_id, balance, created_at, updated_at";

/// Coin balances.
pub struct CoinRepo;

impl CoinRepo {
    pub async fn find(pool: &PgPool, user_id: UserId) -> Result<Option<CoinBalanceRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_coins WHERE user_id = $1");
        sqlx::query_as::<_, CoinBalanceRow>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a zero balance. A second insert for the same user violates the
    /// primary key.
    pub async fn create(pool: &PgPool, user_id: UserId) -> Result<CoinBalanceRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_coins (user_id, balance) VALUES ($1, 0) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CoinBalanceRow>(&query)
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Add `amount`, creating the row if needed. Returns the new balance.
    pub async fn credit(pool: &PgPool, user_id: UserId, amount: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO user_coins (user_id, balance) VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE SET
                balance = user_coins.balance + EXCLUDED.balance,
                updated_at = NOW()
             RETURNING balance",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(pool)
        .await
    }

    /// Conditional decrement in a single statement. Returns `None` when the
    /// balance does not cover `amount` (or no row exists).
    pub async fn debit_if_sufficient(
        pool: &PgPool,
        user_id: UserId,
        amount: i64,
    ) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE user_coins SET balance = balance - $2, updated_at = NOW()
             WHERE user_id = $1 AND balance >= $2
             RETURNING balance",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(pool)
        .await
    }

    /// Move `from`'s balance, transactions and purchased cases onto `to` in
    /// one database transaction. Duplicate case unlocks are dropped and the
    /// `from` balance row is removed.
    pub async fn transfer_ledger(
        pool: &PgPool,
        from: UserId,
        to: UserId,
    ) -> Result<LedgerTransfer, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let moved: Option<i64> =
            sqlx::query_scalar("DELETE FROM user_coins WHERE user_id = $1 RETURNING balance")
                .bind(from)
                .fetch_optional(&mut *tx)
                .await?;
        let coins_moved = moved.unwrap_or(0);

        if moved.is_some() {
            sqlx::query(
                "INSERT INTO user_coins (user_id, balance) VALUES ($1, $2)
                 ON CONFLICT (user_id) DO UPDATE SET
                    balance = user_coins.balance + EXCLUDED.balance,
                    updated_at = NOW()",
            )
            .bind(to)
            .bind(coins_moved)
            .execute(&mut *tx)
            .await?;
        }

        let transactions = sqlx::query("UPDATE coin_transactions SET user_id = $2 WHERE user_id = $1")
            .bind(from)
            .bind(to)
            .execute(&mut *tx)
            .await?;

        let dropped = sqlx::query(
            "DELETE FROM unlocked_cases a
             WHERE a.user_id = $1
               AND EXISTS (
                   SELECT 1 FROM unlocked_cases b
                   WHERE b.user_id = $2 AND b.case_id = a.case_id
               )",
        )
        .bind(from)
        .bind(to)
        .execute(&mut *tx)
        .await?;

        let unlocked = sqlx::query("UPDATE unlocked_cases SET user_id = $2 WHERE user_id = $1")
            .bind(from)
            .bind(to)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(LedgerTransfer {
            coins_moved,
            transactions_moved: transactions.rows_affected(),
            unlocked_cases_moved: unlocked.rows_affected(),
            duplicate_unlocks_dropped: dropped.rows_affected(),
        })
    }
}
