//! The coin ledger: balances, charges, spends and purchase checks.
//!
//! Reads never fail: a store error is logged and the read resolves to a
//! safe default (zero balance, nothing purchased). Mutations return a
//! [`LedgerOutcome`] so callers always branch on an explicit result.
//!
//! The transaction log is the only record of what was bought. A balance
//! change whose log insert fails is still reported as a success.

use std::sync::Arc;

use serde::Serialize;
use sleuth_core::catalog::Catalog;
use sleuth_core::coins::{
    payment_reference_hash, LedgerFailure, LedgerOutcome, NewCoinTransaction, TransactionLookup,
    TransactionPurpose, TransactionType, TransactionView, ANSWER_REVEAL_PRICE, CASE_UNLOCK_PRICE,
};
use sleuth_core::store::{GameStore, StoreError};
use sleuth_core::types::{CaseId, QuestionDbId, QuestionNumber, UserId};

use crate::catalog::CaseRepository;

/// How an answer reveal was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealOutcome {
    /// Bought earlier; nothing was charged.
    AlreadyOwned,
    Purchased,
}

fn store_failure(e: StoreError) -> LedgerFailure {
    LedgerFailure::Store(e.to_string())
}

pub struct CoinLedger {
    store: Arc<dyn GameStore>,
    cases: Arc<CaseRepository>,
}

impl CoinLedger {
    pub fn new(store: Arc<dyn GameStore>, cases: Arc<CaseRepository>) -> Self {
        Self { store, cases }
    }

    // -----------------------------------------------------------------------
    // Balance
    // -----------------------------------------------------------------------

    /// Current balance; a missing row or read error is 0.
    pub async fn get_user_coins(&self, user_id: UserId) -> i64 {
        match self.store.find_balance(user_id).await {
            Ok(balance) => balance.unwrap_or(0),
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Failed to read coin balance");
                0
            }
        }
    }

    /// Create the zero balance row if it does not exist yet.
    pub async fn initialize(&self, user_id: UserId) -> Result<(), StoreError> {
        if self.store.find_balance(user_id).await?.is_some() {
            return Ok(());
        }
        match self.store.create_balance(user_id).await {
            Ok(()) => {
                tracing::debug!(%user_id, "Coin balance initialized");
                Ok(())
            }
            // Lost a creation race; the row exists.
            Err(e) if e.is_unique_violation() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn ensure_initialized(&self, user_id: UserId) {
        if let Err(e) = self.initialize(user_id).await {
            tracing::warn!(%user_id, error = %e, "Failed to initialize coin balance");
        }
    }

    /// Lazily initialize, then read.
    pub async fn balance(&self, user_id: UserId) -> i64 {
        self.ensure_initialized(user_id).await;
        self.get_user_coins(user_id).await
    }

    pub async fn check_balance(&self, user_id: UserId, required: i64) -> bool {
        self.get_user_coins(user_id).await >= required
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Credit purchased coins and log a `charge/coin_purchase` keyed on the
    /// payment id hash.
    pub async fn charge(&self, user_id: UserId, amount: i64, payment_id: &str) -> LedgerOutcome {
        if amount <= 0 {
            return Err(LedgerFailure::InvalidAmount);
        }
        self.ensure_initialized(user_id).await;

        let balance = self
            .store
            .credit_balance(user_id, amount)
            .await
            .map_err(store_failure)?;

        let tx = NewCoinTransaction {
            user_id,
            kind: TransactionType::Charge,
            amount,
            purpose: TransactionPurpose::CoinPurchase,
            related_id: Some(payment_reference_hash(payment_id)),
        };
        if let Err(e) = self.store.insert_transaction(&tx).await {
            tracing::error!(%user_id, payment_id, error = %e, "Coins credited but transaction log insert failed");
        }

        tracing::info!(%user_id, amount, balance, "Coins charged");
        Ok(())
    }

    /// Debit coins for a purchase. Answer reveals are refused when the same
    /// question was already bought.
    pub async fn spend(
        &self,
        user_id: UserId,
        amount: i64,
        purpose: TransactionPurpose,
        related_id: Option<i64>,
    ) -> LedgerOutcome {
        if amount <= 0 {
            return Err(LedgerFailure::InvalidAmount);
        }
        self.ensure_initialized(user_id).await;

        if let (TransactionPurpose::AnswerReveal, Some(related_id)) = (purpose, related_id) {
            let lookup = TransactionLookup {
                user_id,
                kind: Some(TransactionType::Spend),
                purpose,
                related_id,
            };
            match self.store.transaction_exists(&lookup).await {
                Ok(true) => return Err(LedgerFailure::AlreadyPurchased),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(%user_id, related_id, error = %e, "Duplicate reveal check failed, continuing");
                }
            }
        }

        let balance = self
            .store
            .debit_balance_if_sufficient(user_id, amount)
            .await
            .map_err(store_failure)?
            .ok_or(LedgerFailure::InsufficientCoins)?;

        let tx = NewCoinTransaction {
            user_id,
            kind: TransactionType::Spend,
            amount,
            purpose,
            related_id,
        };
        if let Err(e) = self.store.insert_transaction(&tx).await {
            tracing::error!(%user_id, %purpose, error = %e, "Coins spent but transaction log insert failed");
        }

        tracing::info!(%user_id, amount, %purpose, balance, "Coins spent");
        Ok(())
    }

    /// Buy the answer to one question, or confirm it is already owned.
    pub async fn reveal_answer(
        &self,
        user_id: UserId,
        case_id: CaseId,
        question: QuestionNumber,
    ) -> Result<RevealOutcome, LedgerFailure> {
        let db_id = self
            .cases
            .question_db_id(case_id, question)
            .await
            .map_err(store_failure)?
            .ok_or(LedgerFailure::QuestionNotFound)?;

        if self.check_answer_purchased(user_id, db_id, Some(question)).await {
            return Ok(RevealOutcome::AlreadyOwned);
        }

        match self
            .spend(user_id, ANSWER_REVEAL_PRICE, TransactionPurpose::AnswerReveal, Some(db_id))
            .await
        {
            Ok(()) => Ok(RevealOutcome::Purchased),
            Err(LedgerFailure::AlreadyPurchased) => Ok(RevealOutcome::AlreadyOwned),
            Err(e) => Err(e),
        }
    }

    /// Buy a case outright, bypassing the sequential unlock order.
    pub async fn unlock_case(&self, user_id: UserId, case_id: CaseId) -> LedgerOutcome {
        if self.cases.case(case_id).await.map_err(store_failure)?.is_none() {
            return Err(LedgerFailure::CaseNotFound);
        }
        if self.unlocked_cases(user_id).await.contains(&case_id) {
            return Err(LedgerFailure::CaseAlreadyUnlocked);
        }

        self.spend(user_id, CASE_UNLOCK_PRICE, TransactionPurpose::CaseUnlock, Some(case_id))
            .await?;

        match self.store.insert_unlocked_case(user_id, case_id).await {
            Ok(()) => {
                tracing::info!(%user_id, case_id, "Case unlocked");
                Ok(())
            }
            Err(e) if e.is_unique_violation() => Ok(()),
            Err(e) => {
                tracing::error!(%user_id, case_id, error = %e, "Coins spent but unlock insert failed");
                Err(store_failure(e))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Purchase checks
    // -----------------------------------------------------------------------

    /// True when a coin purchase for `payment_id` was already credited.
    pub async fn is_payment_already_processed(&self, user_id: UserId, payment_id: &str) -> bool {
        let lookup = TransactionLookup {
            user_id,
            kind: Some(TransactionType::Charge),
            purpose: TransactionPurpose::CoinPurchase,
            related_id: payment_reference_hash(payment_id),
        };
        self.store.transaction_exists(&lookup).await.unwrap_or_else(|e| {
            tracing::warn!(%user_id, payment_id, error = %e, "Payment replay check failed");
            false
        })
    }

    /// Coin-purchased case ids.
    pub async fn unlocked_cases(&self, user_id: UserId) -> Vec<CaseId> {
        self.store.list_unlocked_cases(user_id).await.unwrap_or_else(|e| {
            tracing::warn!(%user_id, error = %e, "Failed to list unlocked cases");
            Vec::new()
        })
    }

    /// True when an answer reveal exists for the question's storage id, or
    /// for its ordinal in records written before storage ids were used.
    pub async fn check_answer_purchased(
        &self,
        user_id: UserId,
        db_id: QuestionDbId,
        ordinal: Option<QuestionNumber>,
    ) -> bool {
        let candidates = std::iter::once(db_id).chain(ordinal.map(i64::from));
        for related_id in candidates {
            let lookup = TransactionLookup {
                user_id,
                kind: None,
                purpose: TransactionPurpose::AnswerReveal,
                related_id,
            };
            match self.store.transaction_exists(&lookup).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(%user_id, related_id, error = %e, "Answer purchase check failed");
                }
            }
        }
        false
    }

    /// Ordinals in `case_id` whose answers were bought, sorted.
    pub async fn purchased_answers(&self, user_id: UserId, case_id: CaseId) -> Vec<QuestionNumber> {
        let case = match self.cases.case(case_id).await {
            Ok(Some(case)) => case,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(case_id, error = %e, "Failed to load case for purchased answers");
                return Vec::new();
            }
        };
        let reveals = match self
            .store
            .list_transactions(user_id, Some(TransactionPurpose::AnswerReveal))
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Failed to list answer reveals");
                return Vec::new();
            }
        };

        let index = case.index();
        let mut ordinals: Vec<QuestionNumber> = reveals
            .iter()
            .filter_map(|tx| tx.related_id)
            .filter_map(|id| index.ordinal(id))
            .collect();
        ordinals.sort_unstable();
        ordinals.dedup();
        ordinals
    }

    /// Newest first; answer reveals carry their case and question number.
    pub async fn transactions(&self, user_id: UserId) -> Vec<TransactionView> {
        let rows = match self.store.list_transactions(user_id, None).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Failed to list coin transactions");
                return Vec::new();
            }
        };
        let catalog = self.cases.catalog().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Case catalog unavailable, transactions not enriched");
            Arc::new(Catalog::default())
        });

        rows.into_iter()
            .map(|transaction| {
                let location = match (transaction.purpose, transaction.related_id) {
                    (TransactionPurpose::AnswerReveal, Some(id)) => catalog.locate_question(id),
                    _ => None,
                };
                TransactionView {
                    case_id: location.as_ref().map(|l| l.case.id),
                    case_title: location.as_ref().map(|l| l.case.title.clone()),
                    question_number: location.as_ref().map(|l| l.question_number),
                    transaction,
                }
            })
            .collect()
    }
}
