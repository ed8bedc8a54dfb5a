pub mod analysis;
pub mod prompt;
pub mod rest;

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

pub use analysis::{AnalysisInput, AnalysisQuery, AnalysisReport, Analyzer, ProviderStatus};

pub struct AppState {
    pub analyzer: Analyzer,
}

/// Routes plus CORS and request tracing. `allowed_origin` of `None` allows any origin.
pub fn build_router(state: Arc<AppState>, allowed_origin: Option<&str>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/analyze", post(rest::analyze::api_analyze))
        .route("/analyze", post(rest::analyze::api_analyze))
        .with_state(state)
        .layer(cors_layer(allowed_origin))
        // Method + path only; request bodies carry caller keywords.
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let origin = match allowed_origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => AllowOrigin::exact(value),
        Some(Err(_)) => {
            warn!("ALLOWED_ORIGIN is not a valid header value, allowing any origin");
            AllowOrigin::any()
        }
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
