use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use vq_shared::errors::AppResult;
use vq_shared::types::api::MessageResponse;

use crate::routes::blocking;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[serde(alias = "newPassword", alias = "new_password")]
    pub password: String,
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    blocking(move || state.services.accounts.reset_password(&req.token, &req.password)).await?;
    Ok(Json(MessageResponse::new("Password reset successful, log in again on every device")))
}
