use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use vq_shared::errors::{AppError, AppResult, ErrorCode};
use vq_shared::types::api::MessageResponse;

use crate::routes::blocking;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let core = state.clone();
    let pending = blocking(move || core.services.accounts.request_password_reset(&req.email))
        .await
        .map_err(|e| match e.code() {
            ErrorCode::UserNotFound => AppError::bad_request("Email not found in database"),
            _ => e,
        })?;

    let link = format!("{}/changepassword/{}", state.config.app_base_url, pending.token);
    state
        .email
        .send_password_reset_link(&pending.email, &link)
        .await
        .map_err(|e| AppError::internal(format!("failed to send reset email: {e}")))?;

    tracing::info!(user_id = %pending.user_id, "password reset email sent");
    Ok(Json(MessageResponse::new(format!(
        "A link to reset your password has been sent to your email, it is valid for {} minutes",
        state.services.accounts.token_ttl_minutes()
    ))))
}
