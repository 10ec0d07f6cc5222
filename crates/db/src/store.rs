//! [`PgStore`]: the PostgreSQL implementation of the core store traits.

use std::collections::HashMap;

use async_trait::async_trait;
use sleuth_core::catalog::{Case, CaseSummary, Catalog, Question};
use sleuth_core::coins::{CoinTransaction, NewCoinTransaction, TransactionLookup, TransactionPurpose};
use sleuth_core::geometry::AnswerRegion;
use sleuth_core::progress::UserProgress;
use sleuth_core::store::{
    CatalogStore, GameStore, LedgerStore, LedgerTransfer, ProgressStore, StoreError, StoreResult,
};
use sleuth_core::types::{CaseId, QuestionDbId, UserId};

use crate::models::case::{AnswerRegionRow, QuestionRow};
use crate::models::coin::CoinTransactionRow;
use crate::repositories::{CaseRepo, CoinRepo, ProgressRepo, TransactionRepo, UnlockedCaseRepo};
use crate::DbPool;

/// PostgreSQL error code for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Map a sqlx error onto the store error taxonomy.
pub fn store_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            return StoreError::UniqueViolation(constraint);
        }
    }
    StoreError::Backend(err.to_string())
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Attach regions to questions and questions to their cases.
fn assemble_questions(
    questions: Vec<QuestionRow>,
    regions: Vec<AnswerRegionRow>,
) -> HashMap<CaseId, Vec<Question>> {
    let mut regions_by_question: HashMap<QuestionDbId, Vec<AnswerRegion>> = HashMap::new();
    for region in regions {
        regions_by_question
            .entry(region.question_id)
            .or_default()
            .push(region.into());
    }

    let mut by_case: HashMap<CaseId, Vec<Question>> = HashMap::new();
    for q in questions {
        let case_id = q.case_id;
        let regions = regions_by_question.remove(&q.id).unwrap_or_default();
        by_case
            .entry(case_id)
            .or_default()
            .push(q.into_question(regions));
    }
    by_case
}

fn into_transaction(row: CoinTransactionRow) -> StoreResult<CoinTransaction> {
    CoinTransaction::try_from(row).map_err(|e| StoreError::Backend(e.to_string()))
}

// ---------------------------------------------------------------------------
// CatalogStore
// ---------------------------------------------------------------------------

#[async_trait]
impl CatalogStore for PgStore {
    async fn load_catalog(&self) -> StoreResult<Catalog> {
        let cases = CaseRepo::list(&self.pool).await.map_err(store_err)?;
        let questions = CaseRepo::list_questions(&self.pool).await.map_err(store_err)?;
        let regions = CaseRepo::list_regions(&self.pool).await.map_err(store_err)?;

        let mut by_case = assemble_questions(questions, regions);
        let cases = cases
            .into_iter()
            .map(|row| {
                let questions = by_case.remove(&row.id).unwrap_or_default();
                row.into_case(questions)
            })
            .collect();
        Ok(Catalog::new(cases))
    }

    async fn list_case_summaries(&self) -> StoreResult<Vec<CaseSummary>> {
        let rows = CaseRepo::list_summaries(&self.pool).await.map_err(store_err)?;
        Ok(rows.into_iter().map(CaseSummary::from).collect())
    }

    async fn load_case(&self, case_id: CaseId) -> StoreResult<Option<Case>> {
        let Some(row) = CaseRepo::find_by_id(&self.pool, case_id).await.map_err(store_err)? else {
            return Ok(None);
        };
        let questions = CaseRepo::list_questions_for_case(&self.pool, case_id)
            .await
            .map_err(store_err)?;
        let ids: Vec<QuestionDbId> = questions.iter().map(|q| q.id).collect();
        let regions = CaseRepo::list_regions_for_questions(&self.pool, &ids)
            .await
            .map_err(store_err)?;

        let mut by_case = assemble_questions(questions, regions);
        let questions = by_case.remove(&case_id).unwrap_or_default();
        Ok(Some(row.into_case(questions)))
    }
}

// ---------------------------------------------------------------------------
// ProgressStore
// ---------------------------------------------------------------------------

#[async_trait]
impl ProgressStore for PgStore {
    async fn upsert_progress(&self, progress: &UserProgress) -> StoreResult<()> {
        ProgressRepo::upsert(&self.pool, progress)
            .await
            .map(|_| ())
            .map_err(store_err)
    }

    async fn find_progress(
        &self,
        user_id: UserId,
        case_id: CaseId,
    ) -> StoreResult<Option<UserProgress>> {
        let row = ProgressRepo::find(&self.pool, user_id, case_id)
            .await
            .map_err(store_err)?;
        Ok(row.map(UserProgress::from))
    }

    async fn list_progress(&self, user_id: UserId) -> StoreResult<Vec<UserProgress>> {
        let rows = ProgressRepo::list_for_user(&self.pool, user_id)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(UserProgress::from).collect())
    }

    async fn delete_progress(&self, user_id: UserId, case_id: CaseId) -> StoreResult<bool> {
        ProgressRepo::delete(&self.pool, user_id, case_id)
            .await
            .map_err(store_err)
    }

    async fn delete_all_progress(&self, user_id: UserId) -> StoreResult<u64> {
        ProgressRepo::delete_all_for_user(&self.pool, user_id)
            .await
            .map_err(store_err)
    }

    async fn reassign_progress(
        &self,
        from: UserId,
        to: UserId,
        case_id: CaseId,
    ) -> StoreResult<bool> {
        ProgressRepo::reassign(&self.pool, from, to, case_id)
            .await
            .map_err(store_err)
    }
}

// ---------------------------------------------------------------------------
// LedgerStore
// ---------------------------------------------------------------------------

#[async_trait]
impl LedgerStore for PgStore {
    async fn find_balance(&self, user_id: UserId) -> StoreResult<Option<i64>> {
        let row = CoinRepo::find(&self.pool, user_id).await.map_err(store_err)?;
        Ok(row.map(|r| r.balance))
    }

    async fn create_balance(&self, user_id: UserId) -> StoreResult<()> {
        CoinRepo::create(&self.pool, user_id)
            .await
            .map(|_| ())
            .map_err(store_err)
    }

    async fn credit_balance(&self, user_id: UserId, amount: i64) -> StoreResult<i64> {
        CoinRepo::credit(&self.pool, user_id, amount)
            .await
            .map_err(store_err)
    }

    async fn debit_balance_if_sufficient(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> StoreResult<Option<i64>> {
        CoinRepo::debit_if_sufficient(&self.pool, user_id, amount)
            .await
            .map_err(store_err)
    }

    async fn insert_transaction(&self, tx: &NewCoinTransaction) -> StoreResult<CoinTransaction> {
        let row = TransactionRepo::insert(&self.pool, tx)
            .await
            .map_err(store_err)?;
        into_transaction(row)
    }

    async fn transaction_exists(&self, lookup: &TransactionLookup) -> StoreResult<bool> {
        TransactionRepo::exists(&self.pool, lookup)
            .await
            .map_err(store_err)
    }

    async fn list_transactions(
        &self,
        user_id: UserId,
        purpose: Option<TransactionPurpose>,
    ) -> StoreResult<Vec<CoinTransaction>> {
        let rows = TransactionRepo::list_for_user(&self.pool, user_id, purpose)
            .await
            .map_err(store_err)?;
        rows.into_iter().map(into_transaction).collect()
    }

    async fn list_unlocked_cases(&self, user_id: UserId) -> StoreResult<Vec<CaseId>> {
        let rows = UnlockedCaseRepo::list_for_user(&self.pool, user_id)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(|r| r.case_id).collect())
    }

    async fn insert_unlocked_case(&self, user_id: UserId, case_id: CaseId) -> StoreResult<()> {
        UnlockedCaseRepo::insert(&self.pool, user_id, case_id)
            .await
            .map(|_| ())
            .map_err(store_err)
    }

    async fn transfer_ledger(&self, from: UserId, to: UserId) -> StoreResult<LedgerTransfer> {
        CoinRepo::transfer_ledger(&self.pool, from, to)
            .await
            .map_err(store_err)
    }
}

#[async_trait]
impl GameStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await.map_err(store_err)
    }
}
