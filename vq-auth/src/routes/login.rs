use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use vq_shared::errors::AppResult;
use vq_shared::types::auth::TokenPair;

use crate::routes::blocking;
use crate::services::session::LoginInput;
use crate::AppState;

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginInput>,
) -> AppResult<Json<TokenPair>> {
    let pair = blocking(move || state.services.sessions.login(req)).await?;
    Ok(Json(pair))
}
