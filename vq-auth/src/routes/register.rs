use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use vq_shared::errors::AppResult;

use crate::models::User;
use crate::routes::blocking;
use crate::services::credentials::SignupInput;
use crate::AppState;

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = blocking(move || state.services.credentials.register(req)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct UsernameAvailability {
    pub available: bool,
}

pub async fn check_username(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsernameQuery>,
) -> AppResult<Json<UsernameAvailability>> {
    let available = blocking(move || state.services.credentials.username_available(&query.username)).await?;
    Ok(Json(UsernameAvailability { available }))
}
