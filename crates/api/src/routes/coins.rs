use axum::routing::get;
use axum::Router;

use crate::handlers::coins;
use crate::state::AppState;

/// Coin routes mounted at `/coins`.
///
/// ```text
/// GET /              -> get_balance
/// GET /transactions  -> list_transactions
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(coins::get_balance))
        .route("/transactions", get(coins::list_transactions))
}
