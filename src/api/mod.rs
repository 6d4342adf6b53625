use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, Method, StatusCode},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::headers;
use crate::AppState;

pub mod handlers;

/// Contact form bodies are small; anything larger is rejected outright.
const BODY_LIMIT_BYTES: usize = 64 * 1024;

/// Routes under `/api`. Relative — the caller mounts this.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/csrf-token", get(handlers::issue_csrf_token))
        .route("/contact", post(handlers::submit_contact))
        .route("/gcr-health", get(handlers::gcr_health))
        .fallback(fallback_404)
}

/// The full application: API, liveness, metrics and the response layers.
pub fn app(state: Arc<AppState>) -> Router {
    let dashboard_origin = state.config.dashboard_origin.clone();
    let allow_localhost = state.config.cors_allow_localhost;

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(handlers::metrics))
        .nest("/api", api_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::predicate(move |origin, _| {
                    let origin_str = origin.to_str().unwrap_or("");
                    origin_str == dashboard_origin
                        || (allow_localhost && is_local_dev_origin(origin_str))
                }))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    HeaderName::from_static("content-type"),
                    HeaderName::from_static("authorization"),
                    HeaderName::from_static("x-request-id"),
                ])
                .allow_credentials(true),
        )
        .layer(middleware::from_fn(headers::request_id))
        .layer(middleware::from_fn(headers::security_headers))
}

fn is_local_dev_origin(origin: &str) -> bool {
    origin.starts_with("http://localhost:") || origin.starts_with("http://127.0.0.1:")
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}
