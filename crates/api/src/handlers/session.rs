//! Handler for auth-state transitions reported by the client.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use sleuth_core::account::Principal;
use sleuth_core::error::CoreError;
use sleuth_events::SessionEvent;

use crate::auth::jwt::validate_token;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /session/transitions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    /// Principal before the change; absent on first sign-in.
    #[serde(default)]
    pub previous: Option<Principal>,
    pub current: Principal,
    /// Token for `previous`; required when the transition is an
    /// anonymous → permanent upgrade.
    #[serde(default)]
    pub previous_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
    /// Whether the transition queued an anonymous → permanent migration.
    pub upgrade: bool,
}

/// POST /api/v1/session/transitions
///
/// Publishes the transition on the session bus. Migration runs in the
/// background listener, so the response is `202 Accepted`. The bearer token
/// must match `current` exactly, and an upgrade must prove ownership of the
/// anonymous account with its token in `previousToken`.
pub async fn record_transition(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<TransitionRequest>,
) -> AppResult<impl IntoResponse> {
    if auth.principal() != input.current {
        return Err(AppError::Core(CoreError::Forbidden(
            "token does not belong to the current principal".into(),
        )));
    }

    let event = SessionEvent::new(input.previous, input.current);
    let upgrade = event.upgrade();
    if let Some(up) = upgrade {
        let token = input.previous_token.as_deref().ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "previousToken is required to claim an anonymous account".into(),
            ))
        })?;
        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid or expired previousToken".into(),
            ))
        })?;
        if claims.principal() != Principal::anonymous(up.anonymous) {
            return Err(AppError::Core(CoreError::Forbidden(
                "previousToken does not belong to the previous principal".into(),
            )));
        }
    }

    let upgrade = upgrade.is_some();
    let receivers = state.session_bus.publish(event);

    tracing::debug!(user_id = %auth.user_id, upgrade, receivers, "Session transition recorded");
    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: TransitionResponse { upgrade },
        }),
    ))
}
