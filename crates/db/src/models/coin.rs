//! Coin ledger rows.

use sleuth_core::coins::{CoinTransaction, UnknownVariant};
use sleuth_core::types::{CaseId, DbId, Timestamp, UserId};
use sqlx::FromRow;

/// A row from the `user_coins` table.
#[derive(Debug, Clone, FromRow)]
pub struct CoinBalanceRow {
    pub user_id: UserId,
    pub balance: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `coin_transactions` table.
///
/// `type` and `purpose` are stored as text and parsed on conversion.
#[derive(Debug, Clone, FromRow)]
pub struct CoinTransactionRow {
    pub id: DbId,
    pub user_id: UserId,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub amount: i64,
    pub purpose: String,
    pub related_id: Option<i64>,
    pub created_at: Timestamp,
}

impl TryFrom<CoinTransactionRow> for CoinTransaction {
    type Error = UnknownVariant;

    fn try_from(row: CoinTransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind.parse()?,
            amount: row.amount,
            purpose: row.purpose.parse()?,
            related_id: row.related_id,
            created_at: row.created_at,
        })
    }
}

/// A row from the `unlocked_cases` table.
#[derive(Debug, Clone, FromRow)]
pub struct UnlockedCaseRow {
    pub id: DbId,
    pub user_id: UserId,
    pub case_id: CaseId,
    pub created_at: Timestamp,
}
