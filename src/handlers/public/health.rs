// handlers/public/health.rs - GET /api/health handler

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// Liveness plus a database round trip. Returns 503 while the store is unreachable.
pub async fn health_get(State(state): State<AppState>) -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"status": "healthy", "version": version, "database": "ok"})),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "degraded", "version": version, "database": "unavailable"})),
            )
        }
    }
}
