//! Per-user progress persistence and the derived unlock queries.
//!
//! Progress writes never fail the caller: a store error is logged and the
//! game continues. Display reads degrade to "no progress"; reads that feed
//! a write go through [`ProgressService::try_load`] so a failed read never
//! overwrites a saved row.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sleuth_core::catalog::Catalog;
use sleuth_core::error::CoreError;
use sleuth_core::geometry::{check_answer, BoundingBox, Point, Size};
use sleuth_core::progress::{
    build_case_board, is_case_completed, CaseBoardEntry, LockStatus, UnlockThresholds,
    UserProgress,
};
use sleuth_core::store::{GameStore, StoreError};
use sleuth_core::types::{CaseId, QuestionNumber, UserId};

use crate::catalog::CaseRepository;

/// Result of one click on a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub correct: bool,
    pub completed_questions: Vec<QuestionNumber>,
    pub case_completed: bool,
}

pub struct ProgressService {
    store: Arc<dyn GameStore>,
    cases: Arc<CaseRepository>,
}

impl ProgressService {
    pub fn new(store: Arc<dyn GameStore>, cases: Arc<CaseRepository>) -> Self {
        Self { store, cases }
    }

    // -----------------------------------------------------------------------
    // Row access
    // -----------------------------------------------------------------------

    /// Upsert the `(user, case)` row. Failures are logged, not returned.
    pub async fn save(
        &self,
        user_id: UserId,
        case_id: CaseId,
        current_question_id: QuestionNumber,
        completed_questions: Vec<QuestionNumber>,
    ) {
        let progress = UserProgress::new(
            user_id,
            case_id,
            current_question_id,
            completed_questions,
            Utc::now(),
        );
        if let Err(e) = self.store.upsert_progress(&progress).await {
            tracing::error!(%user_id, case_id, error = %e, "Failed to save progress");
        }
    }

    pub async fn load(&self, user_id: UserId, case_id: CaseId) -> Option<UserProgress> {
        self.try_load(user_id, case_id).await.unwrap_or(None)
    }

    /// Like [`ProgressService::load`], but keeps a store failure distinct
    /// from "no row".
    pub async fn try_load(
        &self,
        user_id: UserId,
        case_id: CaseId,
    ) -> Result<Option<UserProgress>, StoreError> {
        self.store
            .find_progress(user_id, case_id)
            .await
            .inspect_err(|e| {
                tracing::warn!(%user_id, case_id, error = %e, "Failed to load progress");
            })
    }

    /// Explicit reset of one case.
    pub async fn clear(&self, user_id: UserId, case_id: CaseId) {
        match self.store.delete_progress(user_id, case_id).await {
            Ok(deleted) => tracing::info!(%user_id, case_id, deleted, "Progress cleared"),
            Err(e) => tracing::error!(%user_id, case_id, error = %e, "Failed to clear progress"),
        }
    }

    pub async fn list(&self, user_id: UserId) -> Vec<UserProgress> {
        self.store.list_progress(user_id).await.unwrap_or_else(|e| {
            tracing::warn!(%user_id, error = %e, "Failed to list progress");
            Vec::new()
        })
    }

    // -----------------------------------------------------------------------
    // Thresholds
    // -----------------------------------------------------------------------

    async fn catalog_or_empty(&self) -> Arc<Catalog> {
        self.cases.catalog().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Case catalog unavailable, treating as empty");
            Arc::new(Catalog::default())
        })
    }

    pub async fn thresholds(&self, user_id: UserId) -> UnlockThresholds {
        let catalog = self.catalog_or_empty().await;
        let rows = self.list(user_id).await;
        UnlockThresholds::compute(&catalog, &rows)
    }

    /// Highest fully completed case id, or 0.
    pub async fn last_completed_case_id(&self, user_id: UserId) -> CaseId {
        self.thresholds(user_id).await.last_completed
    }

    /// Highest case id with any progress row, or 0.
    pub async fn last_accessible_case_id(&self, user_id: UserId) -> CaseId {
        self.thresholds(user_id).await.last_accessible
    }

    pub async fn lock_status(&self, user_id: UserId, case_id: CaseId, purchased: bool) -> LockStatus {
        self.thresholds(user_id).await.lock_status(case_id, purchased)
    }

    /// Every case with its status for `user_id`, from one progress scan.
    pub async fn case_board(
        &self,
        user_id: UserId,
        purchased: &[CaseId],
    ) -> Result<Vec<CaseBoardEntry>, CoreError> {
        let catalog = self.cases.catalog().await?;
        let rows = self.list(user_id).await;
        Ok(build_case_board(&catalog, &rows, purchased))
    }

    // -----------------------------------------------------------------------
    // Answers
    // -----------------------------------------------------------------------

    /// Mark `question` completed and make it the current question.
    ///
    /// Nothing is written when the existing row cannot be read.
    pub async fn record_completion(
        &self,
        user_id: UserId,
        case_id: CaseId,
        question: QuestionNumber,
    ) -> Result<Vec<QuestionNumber>, StoreError> {
        let mut completed = self
            .try_load(user_id, case_id)
            .await?
            .map(|p| p.completed_questions)
            .unwrap_or_default();
        completed.push(question);
        let progress = UserProgress::new(user_id, case_id, question, completed, Utc::now());
        let completed = progress.completed_questions.clone();
        if let Err(e) = self.store.upsert_progress(&progress).await {
            tracing::error!(%user_id, case_id, question, error = %e, "Failed to record completion");
        }
        Ok(completed)
    }

    /// Hit-test a click and record the completion on a hit.
    pub async fn submit_answer(
        &self,
        user_id: UserId,
        case_id: CaseId,
        question: QuestionNumber,
        click: Point,
        natural: Size,
        container: BoundingBox,
    ) -> Result<AnswerOutcome, CoreError> {
        let case = self
            .cases
            .case(case_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "case",
                id: case_id,
            })?;
        let q = case.question(question).ok_or(CoreError::NotFound {
            entity: "question",
            id: i64::from(question),
        })?;

        let correct = check_answer(click, &q.answer_regions, natural, container);
        let completed_questions = if correct {
            self.record_completion(user_id, case_id, question).await?
        } else {
            self.load(user_id, case_id)
                .await
                .map(|p| p.completed_questions)
                .unwrap_or_default()
        };

        tracing::debug!(%user_id, case_id, question, correct, "Answer submitted");
        Ok(AnswerOutcome {
            correct,
            case_completed: is_case_completed(&case, &completed_questions),
            completed_questions,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use sleuth_core::progress::CaseStatus;
    use uuid::Uuid;

    use super::*;
    use crate::testing::services;

    fn square() -> (Size, BoundingBox) {
        (Size::new(1000.0, 1000.0), BoundingBox::new(0.0, 0.0, 500.0, 500.0))
    }

    #[tokio::test]
    async fn save_is_idempotent() {
        let s = services();
        let user = Uuid::new_v4();

        s.progress.save(user, 1, 2, vec![2, 1]).await;
        s.progress.save(user, 1, 2, vec![1, 2]).await;

        let rows = s.store.progress_rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].completed_questions, vec![1, 2]);
        assert_eq!(rows[0].current_question_id, 2);
    }

    #[tokio::test]
    async fn save_failure_is_swallowed() {
        let s = services();
        let user = Uuid::new_v4();

        s.store.fail_next("upsert_progress");
        s.progress.save(user, 1, 1, vec![1]).await;
        assert!(s.progress.load(user, 1).await.is_none());
    }

    #[tokio::test]
    async fn load_error_reads_as_no_progress() {
        let s = services();
        let user = Uuid::new_v4();
        s.progress.save(user, 1, 1, vec![]).await;

        s.store.fail_next("find_progress");
        assert!(s.progress.load(user, 1).await.is_none());
        assert!(s.progress.load(user, 1).await.is_some());
    }

    #[tokio::test]
    async fn try_load_reports_store_failure() {
        let s = services();
        let user = Uuid::new_v4();

        s.store.fail_next("find_progress");
        assert_matches!(s.progress.try_load(user, 1).await, Err(StoreError::Backend(_)));
        assert_matches!(s.progress.try_load(user, 1).await, Ok(None));
    }

    #[tokio::test]
    async fn completion_after_failed_read_keeps_saved_questions() {
        let s = services();
        let user = Uuid::new_v4();
        s.progress.save(user, 2, 3, vec![1, 2]).await;

        s.store.fail_next("find_progress");
        assert!(s.progress.record_completion(user, 2, 3).await.is_err());

        let row = s.progress.load(user, 2).await.unwrap();
        assert_eq!(row.completed_questions, vec![1, 2]);
        assert_eq!(row.current_question_id, 3);

        let completed = s.progress.record_completion(user, 2, 3).await.unwrap();
        assert_eq!(completed, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn correct_answer_fails_when_progress_is_unreadable() {
        let s = services();
        let user = Uuid::new_v4();
        let (natural, container) = square();
        s.progress.save(user, 1, 1, vec![1]).await;

        s.store.fail_next("find_progress");
        let err = s
            .progress
            .submit_answer(user, 1, 2, Point::new(125.0, 175.0), natural, container)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Internal(_));
        assert_eq!(s.progress.load(user, 1).await.unwrap().completed_questions, vec![1]);
    }

    #[tokio::test]
    async fn fresh_player_sees_only_the_first_case() {
        let s = services();
        let user = Uuid::new_v4();

        let first = s.progress.lock_status(user, 1, false).await;
        assert!(!first.is_locked && first.is_current);
        assert!(s.progress.lock_status(user, 2, false).await.is_locked);
    }

    #[tokio::test]
    async fn mid_case_player_keeps_the_case_unlocked() {
        let s = services();
        let user = Uuid::new_v4();
        s.progress.save(user, 1, 2, vec![1, 2]).await;
        s.progress.save(user, 2, 2, vec![1]).await;

        assert_eq!(s.progress.last_completed_case_id(user).await, 1);
        assert_eq!(s.progress.last_accessible_case_id(user).await, 2);
        let thresholds = s.progress.thresholds(user).await;
        assert_eq!(thresholds.unlocked_threshold(), 2);
        assert!(s.progress.lock_status(user, 2, false).await.is_current);
        assert!(s.progress.lock_status(user, 3, false).await.is_locked);
    }

    #[tokio::test]
    async fn purchased_case_is_never_locked() {
        let s = services();
        let user = Uuid::new_v4();

        let status = s.progress.lock_status(user, 3, true).await;
        assert!(!status.is_locked);
        assert!(s.progress.lock_status(user, 2, false).await.is_locked);
    }

    #[tokio::test]
    async fn catalog_failure_degrades_thresholds_to_zero() {
        let s = services();
        let user = Uuid::new_v4();
        s.progress.save(user, 1, 2, vec![1, 2]).await;

        s.store.fail_next("load_catalog");
        assert_eq!(s.progress.last_completed_case_id(user).await, 0);
    }

    #[tokio::test]
    async fn case_board_reports_statuses() {
        let s = services();
        let user = Uuid::new_v4();
        s.progress.save(user, 1, 2, vec![1, 2]).await;

        let board = s.progress.case_board(user, &[3]).await.unwrap();
        let statuses: Vec<_> = board.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![CaseStatus::Completed, CaseStatus::Current, CaseStatus::Current]
        );
        assert!(board[2].purchased);
        assert_eq!(board[0].completed_questions, 2);
        assert_eq!(board[1].total_questions, 3);
    }

    #[tokio::test]
    async fn correct_answer_records_completion() {
        let s = services();
        let user = Uuid::new_v4();
        let (natural, container) = square();

        // Region (0.2, 0.3) .. (0.3, 0.4) on a 500px container.
        let hit = Point::new(125.0, 175.0);
        let outcome = s
            .progress
            .submit_answer(user, 1, 1, hit, natural, container)
            .await
            .unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.completed_questions, vec![1]);
        assert!(!outcome.case_completed);

        let outcome = s
            .progress
            .submit_answer(user, 1, 2, hit, natural, container)
            .await
            .unwrap();
        assert_eq!(outcome.completed_questions, vec![1, 2]);
        assert!(outcome.case_completed);

        let row = s.progress.load(user, 1).await.unwrap();
        assert_eq!(row.current_question_id, 2);
    }

    #[tokio::test]
    async fn wrong_answer_changes_nothing() {
        let s = services();
        let user = Uuid::new_v4();
        let (natural, container) = square();

        let miss = Point::new(156.0, 175.0);
        let outcome = s
            .progress
            .submit_answer(user, 1, 1, miss, natural, container)
            .await
            .unwrap();
        assert!(!outcome.correct);
        assert!(outcome.completed_questions.is_empty());
        assert!(s.progress.load(user, 1).await.is_none());
    }

    #[tokio::test]
    async fn unknown_case_or_question_is_not_found() {
        let s = services();
        let user = Uuid::new_v4();
        let (natural, container) = square();
        let click = Point::new(0.0, 0.0);

        let err = s
            .progress
            .submit_answer(user, 42, 1, click, natural, container)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "case", id: 42 });

        let err = s
            .progress
            .submit_answer(user, 1, 9, click, natural, container)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "question", id: 9 });
    }
}
