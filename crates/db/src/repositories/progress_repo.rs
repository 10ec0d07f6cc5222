//! Repository for the `user_progress` table.

use sleuth_core::progress::UserProgress;
use sleuth_core::types::{CaseId, UserId};
use sqlx::PgPool;

use crate::models::progress::UserProgressRow;

const COLUMNS: &str = "id, user_id, case_id, current_question_id, completed_questions, \
                       last_updated_at, created_at";

/// Per-user, per-case progress rows.
pub struct ProgressRepo;

impl ProgressRepo {
    /// Insert or replace the row keyed on `(user_id, case_id)`.
    pub async fn upsert(
        pool: &PgPool,
        progress: &UserProgress,
    ) -> Result<UserProgressRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_progress
                (user_id, case_id, current_question_id, completed_questions, last_updated_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_id, case_id) DO UPDATE SET
                current_question_id = EXCLUDED.current_question_id,
                completed_questions = EXCLUDED.completed_questions,
                last_updated_at = EXCLUDED.last_updated_at
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserProgressRow>(&query)
            .bind(progress.user_id)
            .bind(progress.case_id)
            .bind(progress.current_question_id)
            .bind(&progress.completed_questions)
            .bind(progress.last_updated_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find(
        pool: &PgPool,
        user_id: UserId,
        case_id: CaseId,
    ) -> Result<Option<UserProgressRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM user_progress WHERE user_id = $1 AND case_id = $2");
        sqlx::query_as::<_, UserProgressRow>(&query)
            .bind(user_id)
            .bind(case_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<UserProgressRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM user_progress WHERE user_id = $1 ORDER BY case_id ASC");
        sqlx::query_as::<_, UserProgressRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, user_id: UserId, case_id: CaseId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_progress WHERE user_id = $1 AND case_id = $2")
            .bind(user_id)
            .bind(case_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_all_for_user(pool: &PgPool, user_id: UserId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_progress WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Move one row to another user. Fails with a unique violation if the
    /// target already has a row for the case.
    pub async fn reassign(
        pool: &PgPool,
        from: UserId,
        to: UserId,
        case_id: CaseId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_progress SET user_id = $2 WHERE user_id = $1 AND case_id = $3",
        )
        .bind(from)
        .bind(to)
        .bind(case_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
