use axum::routing::get;
use axum::Router;

use crate::handlers::progress;
use crate::state::AppState;

/// Progress routes mounted at `/progress`.
///
/// ```text
/// GET    /thresholds   -> get_thresholds
/// GET    /{case_id}    -> get_progress
/// PUT    /{case_id}    -> save_progress
/// DELETE /{case_id}    -> clear_progress
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/thresholds", get(progress::get_thresholds))
        .route(
            "/{case_id}",
            get(progress::get_progress)
                .put(progress::save_progress)
                .delete(progress::clear_progress),
        )
}
