//! Game services built on the core store traits.
//!
//! - [`CaseRepository`]: case content with an in-memory TTL cache, an
//!   optional on-disk snapshot tier and de-duplicated concurrent loads.
//! - [`ProgressService`]: progress persistence and unlock thresholds.
//! - [`CoinLedger`]: balances, spends, charges and purchase checks.
//! - [`Checkout`]: server-side payment completion.
//! - [`AccountReconciler`]: merges an anonymous account into a permanent one.
//! - [`GameSession`]: one player's question-by-question flow through a case.

pub mod catalog;
pub mod checkout;
pub mod disk_cache;
pub mod ledger;
pub mod progress;
pub mod reconciler;
pub mod session;
pub mod settle;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::CaseRepository;
pub use checkout::{Checkout, CheckoutError, CheckoutReceipt};
pub use disk_cache::DiskCache;
pub use ledger::{CoinLedger, RevealOutcome};
pub use progress::{AnswerOutcome, ProgressService};
pub use reconciler::{AccountReconciler, MigrationReport};
pub use session::{GameSession, SessionServices};
