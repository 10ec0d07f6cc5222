//! In-memory store implementing every core store trait.
//!
//! Used by engine and HTTP tests and for running the server without a
//! database. Data lives in a `HashMap`-based state behind an
//! `Arc<RwLock<...>>` and is lost when the last clone is dropped.
//!
//! Supports per-operation fault injection ([`MemoryStore::fail_next`],
//! [`MemoryStore::fail_always`]) and an artificial catalog load delay so
//! callers can exercise error and concurrency paths.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sleuth_core::catalog::{Case, CaseSummary, Catalog};
use sleuth_core::coins::{CoinTransaction, NewCoinTransaction, TransactionLookup, TransactionPurpose};
use sleuth_core::progress::UserProgress;
use sleuth_core::store::{
    CatalogStore, GameStore, LedgerStore, LedgerTransfer, ProgressStore, StoreError, StoreResult,
};
use sleuth_core::types::{CaseId, DbId, UserId};
use tokio::sync::RwLock;

#[derive(Debug, Default, Clone)]
struct State {
    cases: Vec<Case>,
    progress: HashMap<(UserId, CaseId), UserProgress>,
    balances: HashMap<UserId, i64>,
    transactions: Vec<CoinTransaction>,
    next_transaction_id: DbId,
    unlocked: BTreeSet<(UserId, CaseId)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Once,
    Always,
}

/// In-memory [`GameStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    faults: Arc<Mutex<HashMap<&'static str, Fault>>>,
    catalog_loads: Arc<AtomicUsize>,
    load_delay: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with case content.
    pub fn with_cases(cases: Vec<Case>) -> Self {
        let state = State {
            cases: Catalog::new(cases).cases().to_vec(),
            ..State::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
            ..Self::default()
        }
    }

    /// Delay every catalog read by `delay`.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    /// Make the next call of `op` (a store trait method name) fail.
    pub fn fail_next(&self, op: &'static str) {
        self.set_fault(op, Fault::Once);
    }

    /// Make every call of `op` fail until [`clear_faults`](Self::clear_faults).
    pub fn fail_always(&self, op: &'static str) {
        self.set_fault(op, Fault::Always);
    }

    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.clear();
        }
    }

    /// How many times the full catalog or summaries were read.
    pub fn catalog_loads(&self) -> usize {
        self.catalog_loads.load(Ordering::SeqCst)
    }

    pub async fn replace_cases(&self, cases: Vec<Case>) {
        self.state.write().await.cases = Catalog::new(cases).cases().to_vec();
    }

    pub async fn balance_of(&self, user_id: UserId) -> Option<i64> {
        self.state.read().await.balances.get(&user_id).copied()
    }

    pub async fn progress_rows(&self) -> Vec<UserProgress> {
        let mut rows: Vec<_> = self.state.read().await.progress.values().cloned().collect();
        rows.sort_by_key(|p| (p.user_id, p.case_id));
        rows
    }

    pub async fn transactions_of(&self, user_id: UserId) -> Vec<CoinTransaction> {
        self.state
            .read()
            .await
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    fn set_fault(&self, op: &'static str, fault: Fault) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.insert(op, fault);
        }
    }

    /// Consume an injected fault for `op`, if any.
    fn check(&self, op: &'static str) -> StoreResult<()> {
        let Ok(mut faults) = self.faults.lock() else {
            return Ok(());
        };
        match faults.get(op).copied() {
            Some(Fault::Once) => {
                faults.remove(op);
                Err(StoreError::Backend(format!("injected failure: {op}")))
            }
            Some(Fault::Always) => Err(StoreError::Backend(format!("injected failure: {op}"))),
            None => Ok(()),
        }
    }

    async fn simulate_load(&self) {
        self.catalog_loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

// ---------------------------------------------------------------------------
// CatalogStore
// ---------------------------------------------------------------------------

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn load_catalog(&self) -> StoreResult<Catalog> {
        self.check("load_catalog")?;
        self.simulate_load().await;
        Ok(Catalog::new(self.state.read().await.cases.clone()))
    }

    async fn list_case_summaries(&self) -> StoreResult<Vec<CaseSummary>> {
        self.check("list_case_summaries")?;
        self.simulate_load().await;
        Ok(self.state.read().await.cases.iter().map(Case::summary).collect())
    }

    async fn load_case(&self, case_id: CaseId) -> StoreResult<Option<Case>> {
        self.check("load_case")?;
        Ok(self
            .state
            .read()
            .await
            .cases
            .iter()
            .find(|c| c.id == case_id)
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// ProgressStore
// ---------------------------------------------------------------------------

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn upsert_progress(&self, progress: &UserProgress) -> StoreResult<()> {
        self.check("upsert_progress")?;
        self.state
            .write()
            .await
            .progress
            .insert((progress.user_id, progress.case_id), progress.clone());
        Ok(())
    }

    async fn find_progress(
        &self,
        user_id: UserId,
        case_id: CaseId,
    ) -> StoreResult<Option<UserProgress>> {
        self.check("find_progress")?;
        Ok(self.state.read().await.progress.get(&(user_id, case_id)).cloned())
    }

    async fn list_progress(&self, user_id: UserId) -> StoreResult<Vec<UserProgress>> {
        self.check("list_progress")?;
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .progress
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.case_id);
        Ok(rows)
    }

    async fn delete_progress(&self, user_id: UserId, case_id: CaseId) -> StoreResult<bool> {
        self.check("delete_progress")?;
        Ok(self
            .state
            .write()
            .await
            .progress
            .remove(&(user_id, case_id))
            .is_some())
    }

    async fn delete_all_progress(&self, user_id: UserId) -> StoreResult<u64> {
        self.check("delete_all_progress")?;
        let mut state = self.state.write().await;
        let before = state.progress.len();
        state.progress.retain(|(owner, _), _| *owner != user_id);
        Ok((before - state.progress.len()) as u64)
    }

    async fn reassign_progress(
        &self,
        from: UserId,
        to: UserId,
        case_id: CaseId,
    ) -> StoreResult<bool> {
        self.check("reassign_progress")?;
        let mut state = self.state.write().await;
        if state.progress.contains_key(&(to, case_id)) {
            return Err(StoreError::UniqueViolation(
                "uq_user_progress_user_case".to_string(),
            ));
        }
        match state.progress.remove(&(from, case_id)) {
            Some(mut row) => {
                row.user_id = to;
                state.progress.insert((to, case_id), row);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerStore
// ---------------------------------------------------------------------------

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn find_balance(&self, user_id: UserId) -> StoreResult<Option<i64>> {
        self.check("find_balance")?;
        Ok(self.state.read().await.balances.get(&user_id).copied())
    }

    async fn create_balance(&self, user_id: UserId) -> StoreResult<()> {
        self.check("create_balance")?;
        let mut state = self.state.write().await;
        if state.balances.contains_key(&user_id) {
            return Err(StoreError::UniqueViolation("user_coins_pkey".to_string()));
        }
        state.balances.insert(user_id, 0);
        Ok(())
    }

    async fn credit_balance(&self, user_id: UserId, amount: i64) -> StoreResult<i64> {
        self.check("credit_balance")?;
        let mut state = self.state.write().await;
        let balance = state.balances.entry(user_id).or_insert(0);
        *balance += amount;
        Ok(*balance)
    }

    async fn debit_balance_if_sufficient(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> StoreResult<Option<i64>> {
        self.check("debit_balance_if_sufficient")?;
        let mut state = self.state.write().await;
        match state.balances.get_mut(&user_id) {
            Some(balance) if *balance >= amount => {
                *balance -= amount;
                Ok(Some(*balance))
            }
            _ => Ok(None),
        }
    }

    async fn insert_transaction(&self, tx: &NewCoinTransaction) -> StoreResult<CoinTransaction> {
        self.check("insert_transaction")?;
        let mut state = self.state.write().await;
        state.next_transaction_id += 1;
        let row = CoinTransaction {
            id: state.next_transaction_id,
            user_id: tx.user_id,
            kind: tx.kind,
            amount: tx.amount,
            purpose: tx.purpose,
            related_id: tx.related_id,
            created_at: Utc::now(),
        };
        state.transactions.push(row.clone());
        Ok(row)
    }

    async fn transaction_exists(&self, lookup: &TransactionLookup) -> StoreResult<bool> {
        self.check("transaction_exists")?;
        Ok(self.state.read().await.transactions.iter().any(|t| {
            t.user_id == lookup.user_id
                && lookup.kind.map_or(true, |k| k == t.kind)
                && t.purpose == lookup.purpose
                && t.related_id == Some(lookup.related_id)
        }))
    }

    async fn list_transactions(
        &self,
        user_id: UserId,
        purpose: Option<TransactionPurpose>,
    ) -> StoreResult<Vec<CoinTransaction>> {
        self.check("list_transactions")?;
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id && purpose.map_or(true, |p| p == t.purpose))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }

    async fn list_unlocked_cases(&self, user_id: UserId) -> StoreResult<Vec<CaseId>> {
        self.check("list_unlocked_cases")?;
        Ok(self
            .state
            .read()
            .await
            .unlocked
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, case_id)| *case_id)
            .collect())
    }

    async fn insert_unlocked_case(&self, user_id: UserId, case_id: CaseId) -> StoreResult<()> {
        self.check("insert_unlocked_case")?;
        if self.state.write().await.unlocked.insert((user_id, case_id)) {
            Ok(())
        } else {
            Err(StoreError::UniqueViolation(
                "uq_unlocked_cases_user_case".to_string(),
            ))
        }
    }

    async fn transfer_ledger(&self, from: UserId, to: UserId) -> StoreResult<LedgerTransfer> {
        self.check("transfer_ledger")?;
        let mut state = self.state.write().await;
        let mut report = LedgerTransfer::default();

        if let Some(balance) = state.balances.remove(&from) {
            *state.balances.entry(to).or_insert(0) += balance;
            report.coins_moved = balance;
        }

        for t in state.transactions.iter_mut().filter(|t| t.user_id == from) {
            t.user_id = to;
            report.transactions_moved += 1;
        }

        let owned: Vec<CaseId> = state
            .unlocked
            .iter()
            .filter(|(owner, _)| *owner == from)
            .map(|(_, case_id)| *case_id)
            .collect();
        for case_id in owned {
            state.unlocked.remove(&(from, case_id));
            if state.unlocked.insert((to, case_id)) {
                report.unlocked_cases_moved += 1;
            } else {
                report.duplicate_unlocks_dropped += 1;
            }
        }

        Ok(report)
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.check("ping")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use sleuth_core::coins::TransactionType;
    use uuid::Uuid;

    use super::*;

    fn spend(user_id: UserId, purpose: TransactionPurpose, related_id: i64) -> NewCoinTransaction {
        NewCoinTransaction {
            user_id,
            kind: TransactionType::Spend,
            amount: 3,
            purpose,
            related_id: Some(related_id),
        }
    }

    #[tokio::test]
    async fn create_balance_twice_is_unique_violation() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.create_balance(user).await.unwrap();
        assert_matches!(
            store.create_balance(user).await,
            Err(StoreError::UniqueViolation(_))
        );
    }

    #[tokio::test]
    async fn debit_only_when_sufficient() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        assert_eq!(store.debit_balance_if_sufficient(user, 1).await.unwrap(), None);

        store.credit_balance(user, 5).await.unwrap();
        assert_eq!(store.debit_balance_if_sufficient(user, 3).await.unwrap(), Some(2));
        assert_eq!(store.debit_balance_if_sufficient(user, 3).await.unwrap(), None);
        assert_eq!(store.balance_of(user).await, Some(2));
    }

    #[tokio::test]
    async fn transactions_list_newest_first() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.insert_transaction(&spend(user, TransactionPurpose::AnswerReveal, 1)).await.unwrap();
        store.insert_transaction(&spend(user, TransactionPurpose::CaseUnlock, 2)).await.unwrap();

        let all = store.list_transactions(user, None).await.unwrap();
        assert_eq!(all.iter().map(|t| t.related_id).collect::<Vec<_>>(), vec![Some(2), Some(1)]);

        let reveals = store
            .list_transactions(user, Some(TransactionPurpose::AnswerReveal))
            .await
            .unwrap();
        assert_eq!(reveals.len(), 1);
    }

    #[tokio::test]
    async fn lookup_matches_kind_purpose_and_related_id() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.insert_transaction(&spend(user, TransactionPurpose::AnswerReveal, 42)).await.unwrap();

        let mut lookup = TransactionLookup {
            user_id: user,
            kind: None,
            purpose: TransactionPurpose::AnswerReveal,
            related_id: 42,
        };
        assert!(store.transaction_exists(&lookup).await.unwrap());
        lookup.kind = Some(TransactionType::Charge);
        assert!(!store.transaction_exists(&lookup).await.unwrap());
        lookup.kind = None;
        lookup.user_id = Uuid::new_v4();
        assert!(!store.transaction_exists(&lookup).await.unwrap());
    }

    #[tokio::test]
    async fn injected_faults() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        store.fail_next("find_balance");
        assert!(store.find_balance(user).await.is_err());
        assert!(store.find_balance(user).await.is_ok());

        store.fail_always("ping");
        assert!(store.ping().await.is_err());
        assert!(store.ping().await.is_err());
        store.clear_faults();
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn transfer_moves_everything_and_drops_duplicates() {
        let store = MemoryStore::new();
        let anon = Uuid::new_v4();
        let perm = Uuid::new_v4();

        store.credit_balance(anon, 7).await.unwrap();
        store.credit_balance(perm, 2).await.unwrap();
        store.insert_transaction(&spend(anon, TransactionPurpose::CaseUnlock, 3)).await.unwrap();
        store.insert_unlocked_case(anon, 3).await.unwrap();
        store.insert_unlocked_case(anon, 4).await.unwrap();
        store.insert_unlocked_case(perm, 3).await.unwrap();

        let report = store.transfer_ledger(anon, perm).await.unwrap();
        assert_eq!(
            report,
            LedgerTransfer {
                coins_moved: 7,
                transactions_moved: 1,
                unlocked_cases_moved: 1,
                duplicate_unlocks_dropped: 1,
            }
        );
        assert_eq!(store.balance_of(anon).await, None);
        assert_eq!(store.balance_of(perm).await, Some(9));
        assert_eq!(store.list_unlocked_cases(perm).await.unwrap(), vec![3, 4]);
        assert!(store.list_unlocked_cases(anon).await.unwrap().is_empty());
        assert_eq!(store.transactions_of(perm).await.len(), 1);
    }

    #[tokio::test]
    async fn reassign_refuses_to_overwrite() {
        let store = MemoryStore::new();
        let anon = Uuid::new_v4();
        let perm = Uuid::new_v4();
        let now = Utc::now();
        store.upsert_progress(&UserProgress::new(anon, 1, 1, vec![1], now)).await.unwrap();
        store.upsert_progress(&UserProgress::new(anon, 2, 1, vec![], now)).await.unwrap();
        store.upsert_progress(&UserProgress::new(perm, 2, 1, vec![], now)).await.unwrap();

        assert!(store.reassign_progress(anon, perm, 1).await.unwrap());
        assert_matches!(
            store.reassign_progress(anon, perm, 2).await,
            Err(StoreError::UniqueViolation(_))
        );
        assert!(!store.reassign_progress(anon, perm, 9).await.unwrap());
        assert_eq!(store.find_progress(perm, 1).await.unwrap().unwrap().user_id, perm);
    }
}
