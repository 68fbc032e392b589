use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use std::sync::Arc;

use vq_shared::errors::AppResult;
use vq_shared::types::api::MessageResponse;
use vq_shared::types::auth::AuthUser;

use crate::routes::{blocking, refresh_header};
use crate::AppState;

pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<MessageResponse>> {
    let presented = refresh_header(&headers);
    let outcome = blocking(move || state.services.sessions.logout(presented.as_deref())).await?;
    Ok(Json(MessageResponse::new(outcome.message())))
}

pub async fn logout_all(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<MessageResponse>> {
    let outcome = blocking(move || state.services.sessions.logout_all(user.id)).await?;
    Ok(Json(MessageResponse::new(outcome.message())))
}
