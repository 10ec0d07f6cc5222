//! User progress row.

use sleuth_core::progress::UserProgress;
use sleuth_core::types::{CaseId, DbId, QuestionNumber, Timestamp, UserId};
use sqlx::FromRow;

/// A row from the `user_progress` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserProgressRow {
    pub id: DbId,
    pub user_id: UserId,
    pub case_id: CaseId,
    pub current_question_id: QuestionNumber,
    pub completed_questions: Vec<QuestionNumber>,
    pub last_updated_at: Timestamp,
    pub created_at: Timestamp,
}

impl From<UserProgressRow> for UserProgress {
    fn from(row: UserProgressRow) -> Self {
        UserProgress::new(
            row.user_id,
            row.case_id,
            row.current_question_id,
            row.completed_questions,
            row.last_updated_at,
        )
    }
}
