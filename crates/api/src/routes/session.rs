use axum::routing::post;
use axum::Router;

use crate::handlers::session;
use crate::state::AppState;

/// Session routes mounted at `/session`.
///
/// ```text
/// POST /transitions -> record_transition
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/transitions", post(session::record_transition))
}
