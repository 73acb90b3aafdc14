//! Placeholder resource kept for frontend wiring; nothing is stored.

use axum::{Json, extract::Path, http::StatusCode, response::IntoResponse};
use serde_json::{Map, Value, json};

pub async fn list_examples() -> impl IntoResponse {
    Json(json!({
        "message": "Endpoint exemple GET",
        "data": []
    }))
}

pub async fn create_example(Json(data): Json<Map<String, Value>>) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Ressource créée avec succès",
            "data": data
        })),
    )
}

pub async fn get_example(Path(id): Path<i64>) -> impl IntoResponse {
    Json(json!({
        "message": format!("Ressource avec ID {}", id),
        "data": {}
    }))
}

pub async fn update_example(
    Path(id): Path<i64>,
    Json(data): Json<Map<String, Value>>,
) -> impl IntoResponse {
    Json(json!({
        "message": format!("Ressource {} mise à jour", id),
        "data": data
    }))
}

pub async fn delete_example(Path(id): Path<i64>) -> impl IntoResponse {
    Json(json!({
        "message": format!("Ressource {} supprimée", id)
    }))
}
