//! Handler for the payment-provider completion callback.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use sleuth_engine::CheckoutError;

use crate::error::AppError;
use crate::response::ActionResponse;
use crate::state::AppState;

/// Body of `POST /api/payment/complete`. Both fields are validated by the
/// checkout so a missing field gets its own status code.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePaymentRequest {
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// POST /api/payment/complete
///
/// Verifies the payment with the provider and credits the product's coins.
/// Unauthenticated: the provider's record is the source of truth.
pub async fn complete_payment(
    State(state): State<AppState>,
    Json(input): Json<CompletePaymentRequest>,
) -> Response {
    let payment_id = input.payment_id.as_deref().unwrap_or_default();
    let user_id = input.user_id.as_deref().unwrap_or_default();

    match state.checkout.complete(payment_id, user_id).await {
        Ok(receipt) => Json(ActionResponse::ok(receipt)).into_response(),
        Err(CheckoutError::NotConfigured) if !state.config.is_production() => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": "payments are not configured; set PAYMENT_API_SECRET",
                "code": "NOT_CONFIGURED",
            })),
        )
            .into_response(),
        Err(err) => AppError::Checkout(err).into_response(),
    }
}
