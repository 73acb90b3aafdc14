mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn list_returns_empty_data() {
    let app = TestApp::spawn();

    let (status, body) = app.get("/api/example").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn create_echoes_body_with_201() {
    let app = TestApp::spawn();

    let (status, body) = app
        .post_json("/api/example", json!({ "titre": "Chapitre 1" }))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!({
            "message": "Ressource créée avec succès",
            "data": { "titre": "Chapitre 1" }
        })
    );
}

#[tokio::test]
async fn item_routes_format_the_id() {
    let app = TestApp::spawn();

    let (status, body) = app.get("/api/example/7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Ressource avec ID 7", "data": {} }));

    let (status, body) = app
        .send_json(Method::PUT, "/api/example/7", json!({ "titre": "v2" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Ressource 7 mise à jour");
    assert_eq!(body["data"], json!({ "titre": "v2" }));

    let (status, body) = app
        .request(
            axum::http::Request::builder()
                .method(Method::DELETE)
                .uri("/api/example/7")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Ressource 7 supprimée" }));
}

#[tokio::test]
async fn non_integer_id_is_rejected() {
    let app = TestApp::spawn();

    let (status, _) = app.get("/api/example/abc").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_object_body_is_rejected() {
    let app = TestApp::spawn();

    let (status, _) = app.post_json("/api/example", json!([1, 2, 3])).await;

    assert!(status.is_client_error());
}
