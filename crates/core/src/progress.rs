//! Per-case progress records and the lock/unlock rules derived from them.
//!
//! The unlock frontier comes from two thresholds: the highest case the
//! player has fully completed, and the highest case they have any progress
//! row for. Coin-purchased cases are playable regardless of the frontier.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::catalog::{Case, CaseSummary, Catalog};
use crate::types::{CaseId, QuestionNumber, Timestamp, UserId};

/// One row per (user, case).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_id: UserId,
    pub case_id: CaseId,
    pub current_question_id: QuestionNumber,
    /// Sorted, no duplicates.
    pub completed_questions: Vec<QuestionNumber>,
    pub last_updated_at: Timestamp,
}

impl UserProgress {
    pub fn new(
        user_id: UserId,
        case_id: CaseId,
        current_question_id: QuestionNumber,
        completed_questions: Vec<QuestionNumber>,
        last_updated_at: Timestamp,
    ) -> Self {
        Self {
            user_id,
            case_id,
            current_question_id,
            completed_questions: normalize_completed(completed_questions),
            last_updated_at,
        }
    }

    pub fn has_completed(&self, question: QuestionNumber) -> bool {
        self.completed_questions.binary_search(&question).is_ok()
    }
}

/// Sort and dedup a completed-question list.
pub fn normalize_completed(mut completed: Vec<QuestionNumber>) -> Vec<QuestionNumber> {
    completed.sort_unstable();
    completed.dedup();
    completed
}

/// A case is completed when every one of its questions is in `completed`.
/// A case without questions is never completed.
pub fn is_case_completed(case: &Case, completed: &[QuestionNumber]) -> bool {
    if case.questions.is_empty() {
        return false;
    }
    let done: HashSet<QuestionNumber> = completed.iter().copied().collect();
    case.questions.iter().all(|q| done.contains(&q.id))
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Highest completed case id among known cases, or 0.
///
/// Every case is scanned, so a case completed out of order still counts.
pub fn last_completed_case_id(catalog: &Catalog, rows: &[UserProgress]) -> CaseId {
    catalog
        .cases()
        .iter()
        .filter(|case| {
            rows.iter()
                .find(|p| p.case_id == case.id)
                .is_some_and(|p| is_case_completed(case, &p.completed_questions))
        })
        .map(|case| case.id)
        .max()
        .unwrap_or(0)
}

/// Highest known case id with any progress row, or 0.
pub fn last_accessible_case_id(catalog: &Catalog, rows: &[UserProgress]) -> CaseId {
    catalog
        .cases()
        .iter()
        .filter(|case| rows.iter().any(|p| p.case_id == case.id))
        .map(|case| case.id)
        .max()
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockThresholds {
    pub last_completed: CaseId,
    pub last_accessible: CaseId,
}

impl UnlockThresholds {
    pub fn compute(catalog: &Catalog, rows: &[UserProgress]) -> Self {
        Self {
            last_completed: last_completed_case_id(catalog, rows),
            last_accessible: last_accessible_case_id(catalog, rows),
        }
    }

    /// `max(completed + 1, accessible, 1)`, where a zero threshold
    /// contributes nothing.
    pub fn unlocked_threshold(&self) -> CaseId {
        let from_completed = if self.last_completed > 0 {
            self.last_completed + 1
        } else {
            0
        };
        let from_accessible = self.last_accessible.max(0);
        from_completed.max(from_accessible).max(1)
    }

    pub fn lock_status(&self, case_id: CaseId, purchased: bool) -> LockStatus {
        let threshold = self.unlocked_threshold();
        LockStatus {
            is_locked: !purchased && case_id > threshold,
            is_current: case_id == threshold || (purchased && case_id > threshold),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockStatus {
    pub is_locked: bool,
    pub is_current: bool,
}

// ---------------------------------------------------------------------------
// Case board
// ---------------------------------------------------------------------------

/// Player-facing state of one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Locked,
    /// The frontier case, or a purchased case beyond it.
    Current,
    /// Playable and behind the frontier, not completed.
    Unlocked,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseBoardEntry {
    #[serde(flatten)]
    pub case: CaseSummary,
    pub status: CaseStatus,
    pub purchased: bool,
    pub completed_questions: usize,
    pub total_questions: usize,
}

/// Status for one case. Completion wins over everything else.
pub fn case_status(
    case: &Case,
    progress: Option<&UserProgress>,
    thresholds: &UnlockThresholds,
    purchased: bool,
) -> CaseStatus {
    if progress.is_some_and(|p| is_case_completed(case, &p.completed_questions)) {
        return CaseStatus::Completed;
    }
    let lock = thresholds.lock_status(case.id, purchased);
    if lock.is_locked {
        CaseStatus::Locked
    } else if lock.is_current {
        CaseStatus::Current
    } else {
        CaseStatus::Unlocked
    }
}

/// Build the case list with statuses from a single progress scan.
pub fn build_case_board(
    catalog: &Catalog,
    rows: &[UserProgress],
    purchased: &[CaseId],
) -> Vec<CaseBoardEntry> {
    let thresholds = UnlockThresholds::compute(catalog, rows);
    let purchased: HashSet<CaseId> = purchased.iter().copied().collect();

    catalog
        .cases()
        .iter()
        .map(|case| {
            let progress = rows.iter().find(|p| p.case_id == case.id);
            let is_purchased = purchased.contains(&case.id);
            let completed = progress
                .map(|p| {
                    p.completed_questions
                        .iter()
                        .filter(|n| case.question(**n).is_some())
                        .count()
                })
                .unwrap_or(0);
            CaseBoardEntry {
                case: case.summary(),
                status: case_status(case, progress, &thresholds, is_purchased),
                purchased: is_purchased,
                completed_questions: completed,
                total_questions: case.question_count(),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
