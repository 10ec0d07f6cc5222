use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sleuth_core::coins::LedgerFailure;
use sleuth_core::error::CoreError;
use sleuth_core::store::StoreError;
use sleuth_engine::CheckoutError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors alongside the store, ledger and
/// checkout failures handlers propagate.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `sleuth_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A persistence error from a store implementation.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A rejected coin mutation. Rendered with `success: false`.
    #[error(transparent)]
    Ledger(#[from] LedgerFailure),

    /// A failed payment completion. Rendered with `success: false`.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        INTERNAL_MESSAGE.to_string(),
                    )
                }
            },

            // --- Store errors ---
            AppError::Store(err) => classify_store_error(err),

            // --- Business outcomes ---
            AppError::Ledger(failure) => return ledger_response(failure),
            AppError::Checkout(err) => return checkout_response(err),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a store error into an HTTP status, error code, and message.
///
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::UniqueViolation(constraint) if constraint.starts_with("uq_") => (
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("Duplicate value violates unique constraint: {constraint}"),
        ),
        other => {
            tracing::error!(error = %other, "Store error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                INTERNAL_MESSAGE.to_string(),
            )
        }
    }
}

fn ledger_response(failure: &LedgerFailure) -> Response {
    let (status, code) = match failure {
        LedgerFailure::AlreadyPurchased => (StatusCode::CONFLICT, "ALREADY_PURCHASED"),
        LedgerFailure::CaseAlreadyUnlocked => (StatusCode::CONFLICT, "ALREADY_UNLOCKED"),
        LedgerFailure::InsufficientCoins => (StatusCode::PAYMENT_REQUIRED, "INSUFFICIENT_COINS"),
        LedgerFailure::InvalidAmount => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        LedgerFailure::CaseNotFound | LedgerFailure::QuestionNotFound => {
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        }
        LedgerFailure::Store(msg) => {
            tracing::error!(error = %msg, "Ledger store failure");
            return failure_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                INTERNAL_MESSAGE,
            );
        }
    };
    failure_body(status, code, &failure.message())
}

fn checkout_response(err: &CheckoutError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let code = match err {
        CheckoutError::NotConfigured => "NOT_CONFIGURED",
        CheckoutError::InvalidRequest(_) => "BAD_REQUEST",
        CheckoutError::MissingUser => "UNAUTHORIZED",
        CheckoutError::AlreadyProcessed => "ALREADY_PROCESSED",
        CheckoutError::LookupFailed(_) => "PAYMENT_LOOKUP_FAILED",
        CheckoutError::Rejected(_) => "PAYMENT_VERIFICATION_FAILED",
        CheckoutError::ChargeFailed(_) => "INTERNAL_ERROR",
    };
    failure_body(status, code, &err.to_string())
}

fn failure_body(status: StatusCode, code: &str, message: &str) -> Response {
    let body = json!({
        "success": false,
        "error": message,
        "code": code,
    });
    (status, axum::Json(body)).into_response()
}
