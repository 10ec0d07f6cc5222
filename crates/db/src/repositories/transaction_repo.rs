//! Repository for the append-only `coin_transactions` log.

use sleuth_core::coins::{NewCoinTransaction, TransactionLookup, TransactionPurpose};
use sleuth_core::types::UserId;
use sqlx::PgPool;

use crate::models::coin::CoinTransactionRow;

const COLUMNS: &str = "id, user_id, type, amount, purpose, related_id, created_at";

pub struct TransactionRepo;

impl TransactionRepo {
    pub async fn insert(
        pool: &PgPool,
        input: &NewCoinTransaction,
    ) -> Result<CoinTransactionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO coin_transactions (user_id, type, amount, purpose, related_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CoinTransactionRow>(&query)
            .bind(input.user_id)
            .bind(input.kind.as_str())
            .bind(input.amount)
            .bind(input.purpose.as_str())
            .bind(input.related_id)
            .fetch_one(pool)
            .await
    }

    /// `true` if any transaction matches the lookup. `kind: None` matches
    /// both charges and spends.
    pub async fn exists(pool: &PgPool, lookup: &TransactionLookup) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                 SELECT 1 FROM coin_transactions
                 WHERE user_id = $1
                   AND ($2::TEXT IS NULL OR type = $2)
                   AND purpose = $3
                   AND related_id = $4
             )",
        )
        .bind(lookup.user_id)
        .bind(lookup.kind.map(|k| k.as_str()))
        .bind(lookup.purpose.as_str())
        .bind(lookup.related_id)
        .fetch_one(pool)
        .await
    }

    /// Newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: UserId,
        purpose: Option<TransactionPurpose>,
    ) -> Result<Vec<CoinTransactionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM coin_transactions
             WHERE user_id = $1 AND ($2::TEXT IS NULL OR purpose = $2)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, CoinTransactionRow>(&query)
            .bind(user_id)
            .bind(purpose.map(|p| p.as_str()))
            .fetch_all(pool)
            .await
    }
}
