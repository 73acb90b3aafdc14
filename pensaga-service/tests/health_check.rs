mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{TestApp, test_config};
use pensaga_service::startup::{AppState, Application};
use serde_json::json;
use tower::util::ServiceExt;

#[tokio::test]
async fn root_returns_welcome_document() {
    let app = TestApp::spawn();

    let (status, body) = app.get("/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Bienvenue sur l'API PENSAGA");
    assert_eq!(body["version"], "1.0.0");
    assert_eq!(
        body["endpoints"],
        json!({ "health": "/health", "api": "/api", "ia": "/ia" })
    );
}

#[tokio::test]
async fn health_reports_connected_store() {
    let app = TestApp::spawn();

    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "healthy",
            "message": "API fonctionne correctement",
            "supabase": "connected"
        })
    );
}

#[tokio::test]
async fn health_without_store_is_unhealthy() {
    let app = TestApp::builder().without_store().build();

    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["supabase"], "disconnected");
    assert!(body["message"].as_str().unwrap().contains("Supabase"));
}

#[tokio::test]
async fn readiness_and_metrics_respond() {
    let app = TestApp::spawn();

    let (status, body) = app.get("/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");

    let (status, _) = app.get("/metrics").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_route_returns_french_not_found() {
    let app = TestApp::spawn();

    let (status, body) = app.get("/does-not-exist").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({
            "error": "Route non trouvée",
            "message": "L'endpoint demandé n'existe pas"
        })
    );
}

#[tokio::test]
async fn request_id_is_generated_or_echoed() {
    let app = TestApp::spawn();

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let generated = response.headers().get("x-request-id").unwrap();
    assert!(!generated.to_str().unwrap().is_empty());

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/ready")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "req-42");
}

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let app = TestApp::spawn();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/ia/fix_text")
                .header("origin", "http://localhost:5173")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn server_answers_health_over_tcp() {
    let state = AppState::from_config(test_config());
    let app = Application::with_state(state)
        .await
        .expect("Failed to build test application");
    let port = app.port();

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    let response = reqwest::Client::new()
        .get(format!("http://127.0.0.1:{}/health", port))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["supabase"], "connected");
}
