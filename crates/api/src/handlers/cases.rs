//! Handlers for cases: the case board, case content, answering, and the
//! coin purchases scoped to a case.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use sleuth_core::error::CoreError;
use sleuth_core::geometry::{BoundingBox, Point, Size};
use sleuth_core::types::{CaseId, QuestionNumber};
use sleuth_engine::RevealOutcome;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::{ActionResponse, DataResponse};
use crate::state::AppState;

/// Body of `POST /cases/{id}/answer`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub question_id: QuestionNumber,
    /// Click position in page pixels.
    pub click: Point,
    /// Natural size of the case image.
    pub image: Size,
    /// Bounding box of the element rendering the image.
    pub container: BoundingBox,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockResponse {
    pub case_id: CaseId,
    pub balance: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealResponse {
    pub outcome: RevealOutcome,
    pub balance: i64,
}

/// GET /api/v1/cases
///
/// Every case with the caller's status, from one progress scan.
pub async fn list_cases(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let purchased = state.ledger.unlocked_cases(auth.user_id).await;
    let board = state.progress.case_board(auth.user_id, &purchased).await?;
    Ok(Json(DataResponse { data: board }))
}

/// GET /api/v1/cases/{id}
pub async fn get_case(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(case_id): Path<CaseId>,
) -> AppResult<impl IntoResponse> {
    let case = state
        .cases
        .case(case_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "case",
            id: case_id,
        }))?;
    Ok(Json(DataResponse {
        data: case.as_ref().clone(),
    }))
}

/// POST /api/v1/cases/{id}/answer
///
/// Hit-tests the click and records the completion on a hit. Locked cases
/// cannot be answered.
pub async fn submit_answer(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(case_id): Path<CaseId>,
    Json(input): Json<AnswerRequest>,
) -> AppResult<impl IntoResponse> {
    ensure_playable(&state, &auth, case_id).await?;

    let outcome = state
        .progress
        .submit_answer(
            auth.user_id,
            case_id,
            input.question_id,
            input.click,
            input.image,
            input.container,
        )
        .await?;

    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/cases/{id}/unlock
///
/// Buys the case with coins, bypassing the sequential unlock order.
pub async fn unlock_case(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(case_id): Path<CaseId>,
) -> AppResult<impl IntoResponse> {
    state.ledger.unlock_case(auth.user_id, case_id).await?;
    let balance = state.ledger.get_user_coins(auth.user_id).await;

    tracing::info!(user_id = %auth.user_id, case_id, balance, "Case unlock purchased");
    Ok(Json(ActionResponse::ok(UnlockResponse { case_id, balance })))
}

/// GET /api/v1/cases/{id}/purchased-answers
///
/// Question numbers in the case whose answers the caller bought.
pub async fn purchased_answers(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(case_id): Path<CaseId>,
) -> AppResult<impl IntoResponse> {
    let questions = state.ledger.purchased_answers(auth.user_id, case_id).await;
    Ok(Json(DataResponse { data: questions }))
}

/// POST /api/v1/cases/{id}/questions/{qid}/reveal
///
/// Idempotent: an answer bought earlier is reported as already owned and
/// not charged again. Locked cases cannot be revealed.
pub async fn reveal_answer(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((case_id, question)): Path<(CaseId, QuestionNumber)>,
) -> AppResult<impl IntoResponse> {
    ensure_playable(&state, &auth, case_id).await?;

    let outcome = state
        .ledger
        .reveal_answer(auth.user_id, case_id, question)
        .await?;
    let balance = state.ledger.get_user_coins(auth.user_id).await;
    Ok(Json(ActionResponse::ok(RevealResponse { outcome, balance })))
}

/// 404 for an unknown case, 403 unless the case is accessible or purchased.
async fn ensure_playable(state: &AppState, auth: &AuthUser, case_id: CaseId) -> AppResult<()> {
    if state.cases.case(case_id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "case",
            id: case_id,
        }));
    }

    let purchased = state
        .ledger
        .unlocked_cases(auth.user_id)
        .await
        .contains(&case_id);
    let lock = state
        .progress
        .lock_status(auth.user_id, case_id, purchased)
        .await;
    if lock.is_locked {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "case {case_id} is locked"
        ))));
    }
    Ok(())
}
