//! Application startup and lifecycle management.
//!
//! Adapters are built once from configuration and handed to the handlers
//! through [`AppState`]; the store and the payment provider are optional
//! and their absence is reported per request.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    http::{HeaderName, Method, Response, StatusCode, header},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use service_core::error::AppError;
use service_core::middleware::{metrics::metrics_middleware, tracing::request_id_middleware};
use service_core::observability::extract_request_id;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::PensagaConfig;
use crate::handlers::{example, generation, health, payments, webhook};
use crate::services::{
    AccountStore, OllamaTextProvider, PaymentProvider, StripeClient, SupabaseStore, TextProvider,
    init_metrics,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PensagaConfig>,
    pub text_provider: Arc<dyn TextProvider>,
    /// `None` when the store credentials are missing.
    pub accounts: Option<Arc<dyn AccountStore>>,
    /// `None` when no payment secret key is configured.
    pub payments: Option<Arc<dyn PaymentProvider>>,
}

impl AppState {
    /// Wire the production adapters from configuration.
    pub fn from_config(config: PensagaConfig) -> Self {
        let text_provider: Arc<dyn TextProvider> =
            Arc::new(OllamaTextProvider::new(&config.ollama));

        let accounts: Option<Arc<dyn AccountStore>> = match SupabaseStore::new(&config.supabase) {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                tracing::error!(error = %e, "Account store unavailable");
                None
            }
        };

        let payments: Option<Arc<dyn PaymentProvider>> =
            match StripeClient::from_config(&config.stripe) {
                Some(client) => Some(Arc::new(client)),
                None => {
                    tracing::warn!("STRIPE_SECRET_KEY not set; payment endpoints are disabled");
                    None
                }
            };

        Self {
            config: Arc::new(config),
            text_provider,
            accounts,
            payments,
        }
    }
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Route non trouvée",
            "message": "L'endpoint demandé n'existe pas"
        })),
    )
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Erreur interne du serveur",
            "message": "Une erreur est survenue"
        })),
    )
        .into_response()
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([HeaderName::from_static("x-request-id")])
}

pub fn build_router(state: AppState) -> Router {
    let checkout_routes = Router::new()
        .route(
            "/create-checkout-session",
            post(payments::create_checkout_session),
        )
        .route(
            "/create-subscription-session",
            post(payments::create_subscription_session),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            payments::require_checkout_provider,
        ));

    let payment_routes = Router::new()
        .route("/verify-session/:session_id", get(payments::verify_session))
        .route("/cancel-subscription", post(payments::cancel_subscription))
        .route_layer(from_fn_with_state(
            state.clone(),
            payments::require_payment_provider,
        ));

    Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .route("/ia/generate_pitch", post(generation::generate_pitch))
        .route("/ia/generate_synopsis", post(generation::generate_synopsis))
        .route("/ia/generate_characters", post(generation::generate_characters))
        .route("/ia/generate_episode", post(generation::generate_episode))
        .route("/ia/fix_text", post(generation::fix_text))
        .route("/ia/rephrase_text", post(generation::rephrase_text))
        .route(
            "/api/example",
            get(example::list_examples).post(example::create_example),
        )
        .route(
            "/api/example/:id",
            get(example::get_example)
                .put(example::update_example)
                .delete(example::delete_example),
        )
        .merge(checkout_routes)
        .merge(payment_routes)
        .route("/webhooks/stripe", post(webhook::stripe_webhook))
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer())
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id =
                    extract_request_id(request.headers()).unwrap_or_else(|| "-".to_string());

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Bind the listener and build the router from configuration.
    pub async fn build(config: PensagaConfig) -> Result<Self, AppError> {
        Self::with_state(AppState::from_config(config)).await
    }

    /// Bind using the address in `state.config`; port 0 picks a free port.
    pub async fn with_state(state: AppState) -> Result<Self, AppError> {
        init_metrics();

        let address = state.config.common.bind_address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind to {}: {}", address, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(port = self.port, "HTTP server listening");
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
