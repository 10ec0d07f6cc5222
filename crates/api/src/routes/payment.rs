//! Route for the payment completion callback, mounted at `/api/payment`
//! outside the versioned tree.

use axum::routing::post;
use axum::Router;

use crate::handlers::payment;
use crate::state::AppState;

/// ```text
/// POST /complete -> complete_payment
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/complete", post(payment::complete_payment))
}
