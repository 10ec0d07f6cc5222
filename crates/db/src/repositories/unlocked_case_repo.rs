//! Repository for the `unlocked_cases` table.

use sleuth_core::types::{CaseId, UserId};
use sqlx::PgPool;

use crate::models::coin::UnlockedCaseRow;

const COLUMNS: &str = "id, user_id, case_id, created_at";

/// Cases bought outright with coins.
pub struct UnlockedCaseRepo;

impl UnlockedCaseRepo {
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<UnlockedCaseRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM unlocked_cases WHERE user_id = $1 ORDER BY case_id ASC");
        sqlx::query_as::<_, UnlockedCaseRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Fails with a unique violation (`uq_unlocked_cases_user_case`) when
    /// the user already owns the case.
    pub async fn insert(
        pool: &PgPool,
        user_id: UserId,
        case_id: CaseId,
    ) -> Result<UnlockedCaseRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO unlocked_cases (user_id, case_id) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UnlockedCaseRow>(&query)
            .bind(user_id)
            .bind(case_id)
            .fetch_one(pool)
            .await
    }
}
