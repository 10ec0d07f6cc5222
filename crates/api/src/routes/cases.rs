//! Route definitions for cases and case-scoped purchases.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::cases;
use crate::state::AppState;

/// Case routes mounted at `/cases`.
///
/// ```text
/// GET  /                              -> list_cases
/// GET  /{id}                          -> get_case
/// POST /{id}/answer                   -> submit_answer
/// POST /{id}/unlock                   -> unlock_case
/// GET  /{id}/purchased-answers        -> purchased_answers
/// POST /{id}/questions/{qid}/reveal   -> reveal_answer
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cases::list_cases))
        .route("/{id}", get(cases::get_case))
        .route("/{id}/answer", post(cases::submit_answer))
        .route("/{id}/unlock", post(cases::unlock_case))
        .route("/{id}/purchased-answers", get(cases::purchased_answers))
        .route(
            "/{id}/questions/{qid}/reveal",
            post(cases::reveal_answer),
        )
}
