pub mod cases;
pub mod coins;
pub mod health;
pub mod payment;
pub mod progress;
pub mod session;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /cases                                           case board (GET)
/// /cases/{id}                                      case content (GET)
/// /cases/{id}/answer                               submit a click (POST)
/// /cases/{id}/unlock                               buy the case (POST)
/// /cases/{id}/purchased-answers                    bought question numbers (GET)
/// /cases/{id}/questions/{qid}/reveal               buy an answer (POST)
///
/// /progress/thresholds                             unlock thresholds (GET)
/// /progress/{case_id}                              get, save, clear
///
/// /coins                                           balance (GET)
/// /coins/transactions                              history (GET)
///
/// /session/transitions                             report an auth change (POST)
/// ```
///
/// The payment callback lives outside this tree at `/api/payment`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/cases", cases::router())
        .nest("/progress", progress::router())
        .nest("/coins", coins::router())
        .nest("/session", session::router())
}
