//! Cached read access to case content.
//!
//! [`CaseRepository`] is constructed once at startup and shared by
//! reference. It keeps three tiers in front of the store:
//!
//! 1. the full catalog and the list-only summaries, each held for `ttl`;
//! 2. individually loaded cases, keyed by case id, also held for `ttl`;
//! 3. an optional [`DiskCache`] holding the summaries and the total question
//!    count across restarts.
//!
//! Concurrent cold reads of the full catalog share a single in-flight load.
//! Invalidation is time-based only; case content is never written at runtime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use sleuth_core::catalog::{Case, CaseSummary, Catalog, Question};
use sleuth_core::store::{GameStore, StoreError, StoreResult};
use sleuth_core::types::{CaseId, QuestionDbId, QuestionNumber};
use tokio::time::Instant;

use crate::disk_cache::DiskCache;

/// Default lifetime of every cached tier.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

const SUMMARIES_KEY: &str = "case_summaries";
const QUESTION_COUNT_KEY: &str = "question_count";

type CatalogLoad = Shared<BoxFuture<'static, Result<Arc<Catalog>, StoreError>>>;

#[derive(Debug, Clone)]
struct Cached<T> {
    value: T,
    loaded_at: Instant,
}

impl<T: Clone> Cached<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            loaded_at: Instant::now(),
        }
    }

    fn fresh(&self, ttl: Duration) -> Option<T> {
        (self.loaded_at.elapsed() < ttl).then(|| self.value.clone())
    }
}

#[derive(Default)]
struct CacheState {
    catalog: Option<Cached<Arc<Catalog>>>,
    summaries: Option<Cached<Arc<Vec<CaseSummary>>>>,
    cases: HashMap<CaseId, Cached<Arc<Case>>>,
    in_flight: Option<CatalogLoad>,
}

pub struct CaseRepository {
    store: Arc<dyn GameStore>,
    ttl: Duration,
    disk: Option<DiskCache>,
    state: Mutex<CacheState>,
}

impl CaseRepository {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self {
            store,
            ttl: DEFAULT_CACHE_TTL,
            disk: None,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Enable the persisted snapshot tier.
    pub fn with_disk_cache(mut self, disk: DiskCache) -> Self {
        self.disk = Some(disk);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // -----------------------------------------------------------------------
    // Full catalog
    // -----------------------------------------------------------------------

    /// Every case with questions and regions.
    pub async fn catalog(&self) -> StoreResult<Arc<Catalog>> {
        let load = {
            let mut state = self.lock();
            if let Some(catalog) = state.catalog.as_ref().and_then(|c| c.fresh(self.ttl)) {
                return Ok(catalog);
            }
            match &state.in_flight {
                Some(load) => {
                    tracing::debug!("Joining in-flight catalog load");
                    load.clone()
                }
                None => {
                    let store = Arc::clone(&self.store);
                    let load = async move { store.load_catalog().await.map(Arc::new) }
                        .boxed()
                        .shared();
                    state.in_flight = Some(load.clone());
                    load
                }
            }
        };

        let result = load.clone().await;

        let mut state = self.lock();
        if state.in_flight.as_ref().is_some_and(|f| f.ptr_eq(&load)) {
            state.in_flight = None;
            match &result {
                Ok(catalog) => {
                    tracing::debug!(cases = catalog.cases().len(), "Catalog loaded");
                    state.catalog = Some(Cached::new(Arc::clone(catalog)));
                    for case in catalog.cases() {
                        state.cases.insert(case.id, Cached::new(Arc::new(case.clone())));
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Catalog load failed"),
            }
        }
        result
    }

    /// One case, from the per-case tier, the catalog tier, or the store.
    pub async fn case(&self, case_id: CaseId) -> StoreResult<Option<Arc<Case>>> {
        {
            let mut state = self.lock();
            if let Some(case) = state.cases.get(&case_id).and_then(|c| c.fresh(self.ttl)) {
                return Ok(Some(case));
            }
            let from_catalog = state
                .catalog
                .as_ref()
                .and_then(|c| c.fresh(self.ttl))
                .map(|catalog| catalog.case(case_id).cloned());
            if let Some(found) = from_catalog {
                let found = found.map(Arc::new);
                if let Some(case) = &found {
                    state.cases.insert(case_id, Cached::new(Arc::clone(case)));
                }
                return Ok(found);
            }
        }

        let loaded = self.store.load_case(case_id).await?.map(Arc::new);
        if let Some(case) = &loaded {
            self.lock()
                .cases
                .insert(case_id, Cached::new(Arc::clone(case)));
        }
        Ok(loaded)
    }

    // -----------------------------------------------------------------------
    // List-only tier
    // -----------------------------------------------------------------------

    /// Id, title and thumbnail for every case, for the initial case board.
    pub async fn summaries(&self) -> StoreResult<Arc<Vec<CaseSummary>>> {
        if let Some(summaries) = self.lock().summaries.as_ref().and_then(|c| c.fresh(self.ttl)) {
            return Ok(summaries);
        }

        if let Some(disk) = &self.disk {
            if let Some(summaries) = disk.read::<Vec<CaseSummary>>(SUMMARIES_KEY, self.ttl).await {
                tracing::debug!(count = summaries.len(), "Case summaries served from disk cache");
                let summaries = Arc::new(summaries);
                self.lock().summaries = Some(Cached::new(Arc::clone(&summaries)));
                return Ok(summaries);
            }
        }

        let summaries = Arc::new(self.store.list_case_summaries().await?);
        self.lock().summaries = Some(Cached::new(Arc::clone(&summaries)));
        if let Some(disk) = &self.disk {
            disk.write(SUMMARIES_KEY, summaries.as_ref()).await;
        }
        Ok(summaries)
    }

    /// Number of questions across all cases.
    pub async fn total_question_count(&self) -> StoreResult<usize> {
        let cached = self.lock().catalog.as_ref().and_then(|c| c.fresh(self.ttl));
        if let Some(catalog) = cached {
            return Ok(catalog.total_questions());
        }

        if let Some(disk) = &self.disk {
            if let Some(count) = disk.read::<usize>(QUESTION_COUNT_KEY, self.ttl).await {
                return Ok(count);
            }
        }

        let count = self.catalog().await?.total_questions();
        if let Some(disk) = &self.disk {
            disk.write(QUESTION_COUNT_KEY, &count).await;
        }
        Ok(count)
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Pure lookup against the materialized case.
    pub async fn question(
        &self,
        case_id: CaseId,
        ordinal: QuestionNumber,
    ) -> StoreResult<Option<Question>> {
        Ok(self
            .case(case_id)
            .await?
            .and_then(|case| case.question(ordinal).cloned()))
    }

    pub async fn question_db_id(
        &self,
        case_id: CaseId,
        ordinal: QuestionNumber,
    ) -> StoreResult<Option<QuestionDbId>> {
        Ok(self
            .case(case_id)
            .await?
            .and_then(|case| case.index().db_id(ordinal)))
    }

    pub async fn question_ordinal(
        &self,
        case_id: CaseId,
        db_id: QuestionDbId,
    ) -> StoreResult<Option<QuestionNumber>> {
        Ok(self
            .case(case_id)
            .await?
            .and_then(|case| case.index().ordinal(db_id)))
    }

    /// The case after `case_id` in unlock order.
    pub async fn next_case_id(&self, case_id: CaseId) -> StoreResult<Option<CaseId>> {
        Ok(self.catalog().await?.next_case_id(case_id))
    }

    /// Drop every cached tier, including the disk snapshot.
    pub async fn invalidate(&self) {
        {
            let mut state = self.lock();
            state.catalog = None;
            state.summaries = None;
            state.cases.clear();
        }
        if let Some(disk) = &self.disk {
            disk.remove(SUMMARIES_KEY).await;
            disk.remove(QUESTION_COUNT_KEY).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use sleuth_db::MemoryStore;

    use super::*;
    use crate::testing::case;

    fn repo(store: &MemoryStore) -> CaseRepository {
        CaseRepository::new(Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn catalog_is_cached_within_ttl() {
        let store = MemoryStore::with_cases(vec![case(1, 2), case(2, 3)]);
        let repo = repo(&store);

        let first = repo.catalog().await.unwrap();
        let second = repo.catalog().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.catalog_loads(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn catalog_reloads_after_ttl() {
        let store = MemoryStore::with_cases(vec![case(1, 2)]);
        let repo = repo(&store);

        repo.catalog().await.unwrap();
        tokio::time::advance(DEFAULT_CACHE_TTL + Duration::from_secs(1)).await;
        repo.catalog().await.unwrap();
        assert_eq!(store.catalog_loads(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_cold_reads_share_one_load() {
        let store =
            MemoryStore::with_cases(vec![case(1, 2)]).with_load_delay(Duration::from_millis(50));
        let repo = Arc::new(repo(&store));

        let (a, b, c) = tokio::join!(repo.catalog(), repo.catalog(), repo.catalog());
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert!(c.is_ok());
        assert_eq!(store.catalog_loads(), 1);
    }

    #[tokio::test]
    async fn failed_load_is_not_cached() {
        let store = MemoryStore::with_cases(vec![case(1, 1)]);
        let repo = repo(&store);

        store.fail_next("load_catalog");
        assert!(repo.catalog().await.is_err());
        assert_eq!(repo.catalog().await.unwrap().cases().len(), 1);
    }

    #[tokio::test]
    async fn case_lookups_resolve_both_question_identities() {
        let store = MemoryStore::with_cases(vec![case(3, 4)]);
        let repo = repo(&store);

        assert_eq!(repo.question_db_id(3, 2).await.unwrap(), Some(302));
        assert_eq!(repo.question_ordinal(3, 304).await.unwrap(), Some(4));
        assert_eq!(repo.question(3, 5).await.unwrap(), None);
        assert!(repo.case(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn single_case_reads_do_not_load_the_catalog() {
        let store = MemoryStore::with_cases(vec![case(1, 2), case(2, 2)]);
        let repo = repo(&store);

        let case = repo.case(2).await.unwrap().unwrap();
        assert_eq!(case.question_count(), 2);
        assert_eq!(store.catalog_loads(), 0);

        // Served from the per-case tier even after the store changes.
        store.replace_cases(vec![]).await;
        assert!(repo.case(2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn next_case_follows_id_order() {
        let store = MemoryStore::with_cases(vec![case(1, 1), case(4, 1), case(2, 1)]);
        let repo = repo(&store);

        assert_eq!(repo.next_case_id(1).await.unwrap(), Some(2));
        assert_eq!(repo.next_case_id(2).await.unwrap(), Some(4));
        assert_eq!(repo.next_case_id(4).await.unwrap(), None);
    }

    #[tokio::test]
    async fn summaries_survive_a_restart_through_the_disk_tier() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::with_cases(vec![case(1, 2), case(2, 1)]);

        let first = repo(&store).with_disk_cache(DiskCache::new(dir.path()));
        assert_eq!(first.summaries().await.unwrap().len(), 2);
        assert_eq!(first.total_question_count().await.unwrap(), 3);
        let loads = store.catalog_loads();

        let restarted = repo(&store).with_disk_cache(DiskCache::new(dir.path()));
        assert_eq!(restarted.summaries().await.unwrap().len(), 2);
        assert_eq!(restarted.total_question_count().await.unwrap(), 3);
        assert_eq!(store.catalog_loads(), loads);
    }

    #[tokio::test]
    async fn invalidate_forces_a_reload() {
        let store = MemoryStore::with_cases(vec![case(1, 1)]);
        let repo = repo(&store);

        repo.catalog().await.unwrap();
        store.replace_cases(vec![case(1, 1), case(2, 1)]).await;
        repo.invalidate().await;
        assert_eq!(repo.catalog().await.unwrap().cases().len(), 2);
    }
}
