//! Handlers for per-case progress and the unlock thresholds.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use sleuth_core::error::CoreError;
use sleuth_core::types::{CaseId, QuestionNumber};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `PUT /progress/{caseId}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressRequest {
    pub current_question_id: QuestionNumber,
    #[serde(default)]
    pub completed_questions: Vec<QuestionNumber>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdsResponse {
    pub last_completed: CaseId,
    pub last_accessible: CaseId,
    pub unlocked_threshold: CaseId,
}

/// GET /api/v1/progress/{case_id}
///
/// `data` is `null` when the caller has never opened the case.
pub async fn get_progress(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(case_id): Path<CaseId>,
) -> AppResult<impl IntoResponse> {
    let progress = state.progress.load(auth.user_id, case_id).await;
    Ok(Json(DataResponse { data: progress }))
}

/// PUT /api/v1/progress/{case_id}
///
/// Question numbers must belong to the case. A store failure is logged by
/// the service and does not fail the request.
pub async fn save_progress(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(case_id): Path<CaseId>,
    Json(input): Json<SaveProgressRequest>,
) -> AppResult<impl IntoResponse> {
    let case = state
        .cases
        .case(case_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "case",
            id: case_id,
        }))?;

    let unknown = std::iter::once(input.current_question_id)
        .chain(input.completed_questions.iter().copied())
        .find(|n| case.question(*n).is_none());
    if let Some(n) = unknown {
        return Err(AppError::Core(CoreError::Validation(format!(
            "case {case_id} has no question {n}"
        ))));
    }

    state
        .progress
        .save(
            auth.user_id,
            case_id,
            input.current_question_id,
            input.completed_questions,
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/progress/{case_id}
pub async fn clear_progress(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(case_id): Path<CaseId>,
) -> AppResult<impl IntoResponse> {
    state.progress.clear(auth.user_id, case_id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/progress/thresholds
pub async fn get_thresholds(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let thresholds = state.progress.thresholds(auth.user_id).await;
    Ok(Json(DataResponse {
        data: ThresholdsResponse {
            last_completed: thresholds.last_completed,
            last_accessible: thresholds.last_accessible,
            unlocked_threshold: thresholds.unlocked_threshold(),
        },
    }))
}
