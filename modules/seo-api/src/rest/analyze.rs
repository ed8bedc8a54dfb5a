use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::{AnalysisInput, AnalysisReport};
use crate::AppState;

use super::error_response;

#[derive(Serialize)]
struct AnalyzeResponse {
    success: bool,
    #[serde(flatten)]
    report: AnalysisReport,
}

pub async fn api_analyze(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalysisInput>, JsonRejection>,
) -> Response {
    let Json(input) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "Malformed analysis request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": rejection.body_text() })),
            )
                .into_response();
        }
    };

    match state.analyzer.analyze(&input).await {
        Ok(report) => {
            info!(
                domain = %report.domain,
                results = report.raw_data_snippet.len(),
                "Analysis complete"
            );
            (
                StatusCode::OK,
                Json(AnalyzeResponse {
                    success: true,
                    report,
                }),
            )
                .into_response()
        }
        Err(err) => error_response(&err),
    }
}
