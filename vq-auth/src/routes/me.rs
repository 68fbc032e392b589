use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use vq_shared::errors::AppResult;
use vq_shared::types::auth::AuthUser;

use crate::models::User;
use crate::routes::blocking;
use crate::services::credentials::ProfileUpdate;
use crate::AppState;

pub async fn me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<User>> {
    let user = blocking(move || state.services.credentials.find(user.id)).await?;
    Ok(Json(user))
}

pub async fn update_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProfileUpdate>,
) -> AppResult<Json<User>> {
    let user = blocking(move || state.services.credentials.update_profile(user.id, req)).await?;
    Ok(Json(user))
}
