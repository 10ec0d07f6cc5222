//! Handlers for the caller's coin balance and history.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: i64,
}

/// GET /api/v1/coins
///
/// Creates the zero balance on first access.
pub async fn get_balance(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let balance = state.ledger.balance(auth.user_id).await;
    Ok(Json(DataResponse {
        data: BalanceResponse { balance },
    }))
}

/// GET /api/v1/coins/transactions
///
/// Newest first. Answer reveals carry the case and question they bought.
pub async fn list_transactions(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let transactions = state.ledger.transactions(auth.user_id).await;
    Ok(Json(DataResponse { data: transactions }))
}
