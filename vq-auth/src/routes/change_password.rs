use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use vq_shared::errors::AppResult;
use vq_shared::types::api::MessageResponse;
use vq_shared::types::auth::AuthUser;

use crate::routes::blocking;
use crate::services::account::ChangePasswordInput;
use crate::AppState;

pub async fn change_password(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChangePasswordInput>,
) -> AppResult<Json<MessageResponse>> {
    blocking(move || state.services.accounts.change_password(user.id, req)).await?;
    Ok(Json(MessageResponse::new("Password changed")))
}
