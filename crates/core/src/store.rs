//! Persistence seams.
//!
//! Each trait covers one area of the game's data. Implementations live in
//! `sleuth-db` (PostgreSQL and in-memory). All rows are scoped by user id;
//! implementations must never return another user's data.

use async_trait::async_trait;
use serde::Serialize;

use crate::catalog::{Case, CaseSummary, Catalog};
use crate::coins::{CoinTransaction, NewCoinTransaction, TransactionLookup, TransactionPurpose};
use crate::progress::UserProgress;
use crate::types::{CaseId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read-only case content.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Every case with its questions and answer regions.
    async fn load_catalog(&self) -> StoreResult<Catalog>;

    /// Id, title and thumbnail only.
    async fn list_case_summaries(&self) -> StoreResult<Vec<CaseSummary>>;

    async fn load_case(&self, case_id: CaseId) -> StoreResult<Option<Case>>;
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Insert or replace the row keyed on `(user_id, case_id)`.
    async fn upsert_progress(&self, progress: &UserProgress) -> StoreResult<()>;

    async fn find_progress(
        &self,
        user_id: UserId,
        case_id: CaseId,
    ) -> StoreResult<Option<UserProgress>>;

    async fn list_progress(&self, user_id: UserId) -> StoreResult<Vec<UserProgress>>;

    /// Returns `true` if a row was deleted.
    async fn delete_progress(&self, user_id: UserId, case_id: CaseId) -> StoreResult<bool>;

    async fn delete_all_progress(&self, user_id: UserId) -> StoreResult<u64>;

    /// Re-key one row from `from` to `to`. Returns `true` if a row moved.
    async fn reassign_progress(&self, from: UserId, to: UserId, case_id: CaseId)
        -> StoreResult<bool>;
}

/// Counts reported by [`LedgerStore::transfer_ledger`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTransfer {
    pub coins_moved: i64,
    pub transactions_moved: u64,
    pub unlocked_cases_moved: u64,
    pub duplicate_unlocks_dropped: u64,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_balance(&self, user_id: UserId) -> StoreResult<Option<i64>>;

    /// Create a zero balance. Fails with [`StoreError::UniqueViolation`] if
    /// the row already exists.
    async fn create_balance(&self, user_id: UserId) -> StoreResult<()>;

    /// Add to the balance, returning the new balance.
    async fn credit_balance(&self, user_id: UserId, amount: i64) -> StoreResult<i64>;

    /// Subtract `amount` only if the balance covers it, in one step.
    /// Returns the new balance, or `None` when funds were insufficient.
    async fn debit_balance_if_sufficient(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> StoreResult<Option<i64>>;

    async fn insert_transaction(&self, tx: &NewCoinTransaction) -> StoreResult<CoinTransaction>;

    async fn transaction_exists(&self, lookup: &TransactionLookup) -> StoreResult<bool>;

    /// Newest first, optionally filtered by purpose.
    async fn list_transactions(
        &self,
        user_id: UserId,
        purpose: Option<TransactionPurpose>,
    ) -> StoreResult<Vec<CoinTransaction>>;

    async fn list_unlocked_cases(&self, user_id: UserId) -> StoreResult<Vec<CaseId>>;

    /// Fails with [`StoreError::UniqueViolation`] if already unlocked.
    async fn insert_unlocked_case(&self, user_id: UserId, case_id: CaseId) -> StoreResult<()>;

    /// Move balance, transactions and unlocked cases from `from` to `to`
    /// atomically, then drop the `from` balance row.
    async fn transfer_ledger(&self, from: UserId, to: UserId) -> StoreResult<LedgerTransfer>;
}

/// Everything the game needs from persistence.
#[async_trait]
pub trait GameStore: CatalogStore + ProgressStore + LedgerStore {
    /// Cheap connectivity probe for health checks.
    async fn ping(&self) -> StoreResult<()>;
}
