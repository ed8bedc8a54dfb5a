pub mod analyze;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, warn};

use seo_common::SeoError;

/// Structured JSON error body for every failure kind.
pub fn error_response(err: &SeoError) -> Response {
    match err {
        SeoError::Validation(msg) => {
            warn!(error = %msg, "Rejected analysis request");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": msg })),
            )
                .into_response()
        }
        SeoError::Configuration(_) => {
            error!(error = %err, "Service misconfigured");
            failure(StatusCode::INTERNAL_SERVER_ERROR, err)
        }
        SeoError::Upstream { .. } | SeoError::Generation { .. } => {
            error!(error = %err, "Upstream provider failed");
            failure(StatusCode::BAD_GATEWAY, err)
        }
    }
}

fn failure(status: StatusCode, err: &SeoError) -> Response {
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "details": err.details(),
        })),
    )
        .into_response()
}
