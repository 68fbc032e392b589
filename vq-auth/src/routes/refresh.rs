use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use std::sync::Arc;

use vq_shared::errors::AppResult;
use vq_shared::types::auth::TokenPair;

use crate::routes::{blocking, refresh_header};
use crate::AppState;

/// The presented token is consumed; clients must store the returned one.
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<TokenPair>> {
    let presented = refresh_header(&headers);
    let pair = blocking(move || state.services.sessions.refresh(presented.as_deref())).await?;
    Ok(Json(pair))
}
