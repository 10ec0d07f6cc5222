use std::sync::Arc;
use std::time::Duration;

use sleuth_core::payment::PaymentGateway;
use sleuth_core::store::GameStore;
use sleuth_engine::{
    AccountReconciler, CaseRepository, Checkout, CoinLedger, DiskCache, ProgressService,
};
use sleuth_events::SessionBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; every service is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GameStore>,
    pub config: Arc<ServerConfig>,
    pub cases: Arc<CaseRepository>,
    pub progress: Arc<ProgressService>,
    pub ledger: Arc<CoinLedger>,
    pub checkout: Arc<Checkout>,
    pub reconciler: Arc<AccountReconciler>,
    /// Session transitions published by the auth hook.
    pub session_bus: Arc<SessionBus>,
}

impl AppState {
    /// Wire every service over `store`. `gateway` is `None` when payments
    /// are not configured.
    pub fn new(
        store: Arc<dyn GameStore>,
        config: ServerConfig,
        gateway: Option<Arc<dyn PaymentGateway>>,
    ) -> Self {
        let mut cases = CaseRepository::new(Arc::clone(&store))
            .with_ttl(Duration::from_secs(config.case_cache_ttl_secs));
        if let Some(dir) = &config.case_cache_dir {
            cases = cases.with_disk_cache(DiskCache::new(dir.clone()));
        }
        let cases = Arc::new(cases);

        let progress = Arc::new(ProgressService::new(Arc::clone(&store), Arc::clone(&cases)));
        let ledger = Arc::new(CoinLedger::new(Arc::clone(&store), Arc::clone(&cases)));
        let checkout = Arc::new(Checkout::new(Arc::clone(&ledger), gateway));
        let reconciler = Arc::new(AccountReconciler::new(Arc::clone(&store)));

        Self {
            store,
            config: Arc::new(config),
            cases,
            progress,
            ledger,
            checkout,
            reconciler,
            session_bus: Arc::new(SessionBus::default()),
        }
    }
}
