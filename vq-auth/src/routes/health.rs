use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use vq_shared::types::api::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let pool = state.db.clone();
    let database = match tokio::task::spawn_blocking(move || pool.get().map(|_| ())).await {
        Ok(Ok(())) => HealthCheck { name: "database".into(), status: HealthStatus::Healthy, message: None },
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "database health check failed");
            HealthCheck { name: "database".into(), status: HealthStatus::Unhealthy, message: Some("unreachable".into()) }
        }
        Err(_) => HealthCheck { name: "database".into(), status: HealthStatus::Unhealthy, message: None },
    };

    Json(HealthResponse::healthy("vq-auth", env!("CARGO_PKG_VERSION")).with_checks(vec![database]))
}
