use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use vq_shared::errors::{AppError, AppResult};
use vq_shared::types::api::MessageResponse;
use vq_shared::types::auth::AuthUser;

use crate::routes::blocking;
use crate::AppState;

pub async fn send_verification_email(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<MessageResponse>> {
    let core = state.clone();
    let pending = blocking(move || core.services.accounts.request_email_verification(user.id)).await?;

    let link = format!("{}/verifyemail/{}", state.config.app_base_url, pending.token);
    state
        .email
        .send_verification_link(&pending.email, &link)
        .await
        .map_err(|e| AppError::internal(format!("failed to send verification email: {e}")))?;

    Ok(Json(MessageResponse::new(format!(
        "A verification link has been sent to {}, it is valid for {} minutes",
        pending.email,
        state.services.accounts.token_ttl_minutes()
    ))))
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyEmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    let user = blocking(move || state.services.accounts.verify_email(&req.token)).await?;
    Ok(Json(MessageResponse::new(format!("Email {} verified", user.email))))
}
