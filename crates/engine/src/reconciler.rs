//! Anonymous → permanent account reconciliation.
//!
//! [`AccountReconciler::run`] listens on the [`SessionBus`](sleuth_events::SessionBus)
//! and migrates each upgrade it sees. A repeat of a finished upgrade finds
//! nothing left to move; a repeat that arrives while the same upgrade is
//! still running is skipped. Migration failures are logged; they never
//! reach the sign-in that triggered them.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use sleuth_core::account::{plan_migration, Upgrade};
use sleuth_core::error::CoreError;
use sleuth_core::store::{GameStore, LedgerTransfer};
use sleuth_core::types::CaseId;
use sleuth_events::SessionEvent;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// Cases whose anonymous row was re-keyed.
    pub moved: Vec<CaseId>,
    /// Cases merged into an existing permanent row.
    pub merged: Vec<CaseId>,
    pub ledger: LedgerTransfer,
    pub anonymous_rows_deleted: u64,
    /// The same upgrade was already running; nothing was done.
    pub skipped: bool,
}

pub struct AccountReconciler {
    store: Arc<dyn GameStore>,
    /// Upgrades currently being migrated.
    in_flight: Mutex<HashSet<Upgrade>>,
}

impl AccountReconciler {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self {
            store,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Run the listener loop until the bus is dropped.
    pub async fn run(self: Arc<Self>, mut receiver: broadcast::Receiver<SessionEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let Some(upgrade) = event.upgrade() else {
                        continue;
                    };
                    if let Err(e) = self.upgrade(upgrade).await {
                        tracing::error!(
                            anonymous = %upgrade.anonymous,
                            permanent = %upgrade.permanent,
                            error = %e,
                            "Account migration failed"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Reconciler lagged, some session events were missed");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Session bus closed, reconciler shutting down");
                    break;
                }
            }
        }
    }

    /// Reconcile one upgrade. A call made while the same pair is still
    /// migrating is skipped; later calls rerun the migration, which finds
    /// the anonymous account already empty.
    pub async fn upgrade(&self, upgrade: Upgrade) -> Result<MigrationReport, CoreError> {
        if !self.mark(upgrade) {
            tracing::debug!(anonymous = %upgrade.anonymous, "Upgrade already in progress");
            return Ok(MigrationReport {
                skipped: true,
                ..MigrationReport::default()
            });
        }

        let result = self.migrate(upgrade).await;
        self.unmark(&upgrade);
        result
    }

    fn mark(&self, upgrade: Upgrade) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(upgrade)
    }

    fn unmark(&self, upgrade: &Upgrade) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(upgrade);
    }

    #[cfg(test)]
    fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    async fn migrate(&self, upgrade: Upgrade) -> Result<MigrationReport, CoreError> {
        let Upgrade {
            anonymous,
            permanent,
        } = upgrade;

        let anonymous_rows = self.store.list_progress(anonymous).await?;
        let permanent_rows = self.store.list_progress(permanent).await?;
        let plan = plan_migration(&anonymous_rows, &permanent_rows);

        let mut report = MigrationReport::default();
        for &case_id in &plan.moves {
            if self.store.reassign_progress(anonymous, permanent, case_id).await? {
                report.moved.push(case_id);
            }
        }
        for merged in &plan.merges {
            self.store.upsert_progress(merged).await?;
            report.merged.push(merged.case_id);
        }

        report.ledger = self.store.transfer_ledger(anonymous, permanent).await?;

        // Permanent rows are already correct; leftovers are only orphans.
        match self.store.delete_all_progress(anonymous).await {
            Ok(n) => report.anonymous_rows_deleted = n,
            Err(e) => {
                tracing::warn!(%anonymous, error = %e, "Failed to delete anonymous progress rows");
            }
        }

        tracing::info!(
            %anonymous,
            %permanent,
            moved = report.moved.len(),
            merged = report.merged.len(),
            coins = report.ledger.coins_moved,
            "Account migrated"
        );
        Ok(report)
    }
}
