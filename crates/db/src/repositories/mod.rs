//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod case_repo;
pub mod coin_repo;
pub mod progress_repo;
pub mod transaction_repo;
pub mod unlocked_case_repo;

pub use case_repo::CaseRepo;
pub use coin_repo::CoinRepo;
pub use progress_repo::ProgressRepo;
pub use transaction_repo::TransactionRepo;
pub use unlocked_case_repo::UnlockedCaseRepo;
