//! Account states and the anonymous → permanent progress merge.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::progress::{normalize_completed, UserProgress};
use crate::types::{CaseId, UserId};

/// An authenticated principal as seen by the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: UserId,
    pub is_anonymous: bool,
}

impl Principal {
    pub fn anonymous(id: UserId) -> Self {
        Self {
            id,
            is_anonymous: true,
        }
    }

    pub fn permanent(id: UserId) -> Self {
        Self {
            id,
            is_anonymous: false,
        }
    }

    pub fn state(&self) -> AccountState {
        if self.is_anonymous {
            AccountState::Anonymous(self.id)
        } else {
            AccountState::Permanent(self.id)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountState {
    Anonymous(UserId),
    Permanent(UserId),
}

impl AccountState {
    pub fn id(&self) -> UserId {
        match self {
            Self::Anonymous(id) | Self::Permanent(id) => *id,
        }
    }
}

/// An anonymous principal that became a different, permanent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Upgrade {
    pub anonymous: UserId,
    pub permanent: UserId,
}

/// Classify a session transition. Only anonymous → permanent with distinct
/// ids is an upgrade; everything else (sign-out, refresh, same id) is not.
pub fn upgrade_target(previous: Option<AccountState>, current: AccountState) -> Option<Upgrade> {
    match (previous?, current) {
        (AccountState::Anonymous(anonymous), AccountState::Permanent(permanent))
            if anonymous != permanent =>
        {
            Some(Upgrade {
                anonymous,
                permanent,
            })
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Progress merge
// ---------------------------------------------------------------------------

/// Merge an anonymous row into the permanent row for the same case.
///
/// Completed questions are unioned. The current question and timestamp come
/// from the more recently updated row; on a tie the permanent row wins.
pub fn merge_progress(anonymous: &UserProgress, permanent: &UserProgress) -> UserProgress {
    let mut completed = anonymous.completed_questions.clone();
    completed.extend_from_slice(&permanent.completed_questions);

    let newer = if anonymous.last_updated_at > permanent.last_updated_at {
        anonymous
    } else {
        permanent
    };

    UserProgress {
        user_id: permanent.user_id,
        case_id: permanent.case_id,
        current_question_id: newer.current_question_id,
        completed_questions: normalize_completed(completed),
        last_updated_at: newer.last_updated_at,
    }
}

/// What has to happen to move one user's progress onto another.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationPlan {
    /// Cases where only the anonymous row exists; re-key in place.
    pub moves: Vec<CaseId>,
    /// Merged rows to upsert under the permanent id.
    pub merges: Vec<UserProgress>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && self.merges.is_empty()
    }
}

/// Plan the per-case resolution. Permanent-only cases need nothing.
pub fn plan_migration(anonymous: &[UserProgress], permanent: &[UserProgress]) -> MigrationPlan {
    let existing: HashMap<CaseId, &UserProgress> =
        permanent.iter().map(|p| (p.case_id, p)).collect();

    let mut plan = MigrationPlan::default();
    for row in anonymous {
        match existing.get(&row.case_id) {
            Some(perm) => plan.merges.push(merge_progress(row, perm)),
            None => plan.moves.push(row.case_id),
        }
    }
    plan.moves.sort_unstable();
    plan.merges.sort_by_key(|p| p.case_id);
    plan
}
