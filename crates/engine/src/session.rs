//! One player's question-by-question flow through a case.

use std::future::Future;
use std::sync::Arc;

use sleuth_core::catalog::{Case, Question};
use sleuth_core::coins::LedgerFailure;
use sleuth_core::error::CoreError;
use sleuth_core::geometry::{check_answer, BoundingBox, Point, Size};
use sleuth_core::progress::{is_case_completed, normalize_completed};
use sleuth_core::types::{CaseId, QuestionNumber, UserId};

use crate::catalog::CaseRepository;
use crate::ledger::{CoinLedger, RevealOutcome};
use crate::progress::ProgressService;
use crate::settle::{poll_until, SETTLE_POLL_INTERVAL, SETTLE_TIMEOUT};

/// The services a session talks to.
#[derive(Clone)]
pub struct SessionServices {
    pub cases: Arc<CaseRepository>,
    pub progress: Arc<ProgressService>,
    pub ledger: Arc<CoinLedger>,
}

pub struct GameSession {
    services: SessionServices,
    user_id: UserId,
    case: Arc<Case>,
    current: QuestionNumber,
    completed: Vec<QuestionNumber>,
    revealed: bool,
    last_click: Option<bool>,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("user_id", &self.user_id)
            .field("case_id", &self.case.id)
            .field("current", &self.current)
            .field("completed", &self.completed)
            .field("revealed", &self.revealed)
            .field("last_click", &self.last_click)
            .finish_non_exhaustive()
    }
}

impl GameSession {
    /// Open `case_id` for `user_id`, resuming saved progress.
    ///
    /// Opening a case always writes a progress row so the case counts as
    /// accessible even before the first answer. Fails without writing when
    /// the saved row cannot be read.
    pub async fn start(
        services: SessionServices,
        user_id: UserId,
        case_id: CaseId,
    ) -> Result<Self, CoreError> {
        let case = services
            .cases
            .case(case_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "case",
                id: case_id,
            })?;
        let first = case.questions.first().map(|q| q.id).unwrap_or(1);

        // An unreadable row fails the start instead of being overwritten.
        let saved = services.progress.try_load(user_id, case_id).await?;
        let (current, completed) = match saved {
            Some(row) if case.question(row.current_question_id).is_some() => {
                (row.current_question_id, row.completed_questions)
            }
            Some(row) => (first, row.completed_questions),
            None => (first, Vec::new()),
        };

        services
            .progress
            .save(user_id, case_id, current, completed.clone())
            .await;
        tracing::debug!(%user_id, case_id, current, "Game session started");

        Ok(Self {
            services,
            user_id,
            case,
            current,
            completed,
            revealed: false,
            last_click: None,
        })
    }

    /// Like [`GameSession::start`], but first waits for the auth session to
    /// settle. `principal` is polled until it yields a user id.
    pub async fn start_when_settled<F, Fut>(
        services: SessionServices,
        case_id: CaseId,
        principal: F,
    ) -> Result<Self, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<UserId>>,
    {
        let user_id = poll_until(SETTLE_POLL_INTERVAL, SETTLE_TIMEOUT, principal)
            .await
            .ok_or_else(|| CoreError::Unauthorized("session did not settle".into()))?;
        Self::start(services, user_id, case_id).await
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn case(&self) -> &Case {
        &self.case
    }

    pub fn current_question_number(&self) -> QuestionNumber {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.case.question(self.current)
    }

    pub fn completed_questions(&self) -> &[QuestionNumber] {
        &self.completed
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Result of the last click on the current question, if any.
    pub fn last_click(&self) -> Option<bool> {
        self.last_click
    }

    pub fn is_case_completed(&self) -> bool {
        is_case_completed(&self.case, &self.completed)
    }

    /// Hit-test a click on the current question. A hit marks the question
    /// completed and saves progress.
    pub async fn click(&mut self, click: Point, natural: Size, container: BoundingBox) -> bool {
        let Some(question) = self.current_question() else {
            return false;
        };
        let hit = check_answer(click, &question.answer_regions, natural, container);
        self.last_click = Some(hit);

        if hit {
            let mut completed = std::mem::take(&mut self.completed);
            completed.push(self.current);
            self.completed = normalize_completed(completed);
            self.save().await;
        }
        hit
    }

    /// Clear the last click so the player can try again.
    pub fn retry(&mut self) {
        self.last_click = None;
    }

    /// Show the current answer, buying it if it is not owned yet.
    pub async fn reveal(&mut self) -> Result<RevealOutcome, LedgerFailure> {
        let outcome = self
            .services
            .ledger
            .reveal_answer(self.user_id, self.case.id, self.current)
            .await?;
        self.revealed = true;
        Ok(outcome)
    }

    /// Move to the next question and save. Returns `false` when the current
    /// question was the last one.
    pub async fn next_question(&mut self) -> bool {
        let Some(next) = self
            .case
            .questions
            .iter()
            .map(|q| q.id)
            .find(|&id| id > self.current)
        else {
            return false;
        };
        self.current = next;
        self.revealed = false;
        self.last_click = None;
        self.save().await;
        true
    }

    async fn save(&self) {
        self.services
            .progress
            .save(self.user_id, self.case.id, self.current, self.completed.clone())
            .await;
    }
}
