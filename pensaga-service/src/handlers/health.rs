use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::services::get_metrics;
use crate::startup::AppState;

/// Welcome document listing the top-level endpoints.
pub async fn index() -> impl IntoResponse {
    Json(json!({
        "message": "Bienvenue sur l'API PENSAGA",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "api": "/api",
            "ia": "/ia"
        }
    }))
}

/// Liveness: reports whether the store client was built. No query is run.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.accounts.is_some() {
        (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "message": "API fonctionne correctement",
                "supabase": "connected"
            })),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "unhealthy",
                "message": "Les configurations Supabase ne sont pas définies",
                "supabase": "disconnected"
            })),
        )
    }
}

pub async fn readiness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}

/// Prometheus metrics endpoint.
pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
