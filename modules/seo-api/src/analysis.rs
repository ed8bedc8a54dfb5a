//! Keyword/domain analysis: ranking data in, narrative report out.
//!
//! A ranking-provider failure ends the request before any generation call.
//! A generation failure also ends the request; no placeholder text is substituted.

use std::fmt;
use std::sync::Arc;

use ai_client::{AiError, TextGenerator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, Instrument};
use uuid::Uuid;

use seo_common::{retry_with_backoff, Config, RetryExhausted, Retryable, SeoError};
use serp_client::{extract_organic_results, ResultRecord, SerpClient, UpstreamResponse, ORGANIC_LIVE_ADVANCED};

use crate::prompt;

/// Most records passed on to the prompt and echoed in the report.
pub const SAMPLE_SIZE: usize = 8;

const DEFAULT_LANGUAGE_CODE: &str = "en";
const DEFAULT_DEVICE: &str = "desktop";

// =============================================================================
// Input
// =============================================================================

/// Caller input as received. Loosely typed so validation can report precise errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisInput {
    #[serde(default)]
    pub keyword: Option<Value>,
    #[serde(default)]
    pub domain: Option<Value>,
    #[serde(default)]
    pub target_domain: Option<Value>,
    #[serde(default)]
    pub location_code: Option<Value>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
}

/// Validated, fully-defaulted query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisQuery {
    pub keyword: String,
    pub domain: String,
    pub location_code: i64,
    pub language_code: String,
    pub device: String,
}

impl AnalysisInput {
    pub fn validate(&self, default_location_code: i64) -> Result<AnalysisQuery, SeoError> {
        let keyword = required_text(self.keyword.as_ref(), "keyword")?;
        let domain = required_text(
            self.domain.as_ref().or(self.target_domain.as_ref()),
            "domain",
        )?;
        let location_code = coerce_location_code(self.location_code.as_ref(), default_location_code)?;

        Ok(AnalysisQuery {
            keyword,
            domain,
            location_code,
            language_code: non_blank(self.language_code.as_deref())
                .unwrap_or(DEFAULT_LANGUAGE_CODE)
                .to_string(),
            device: non_blank(self.device.as_deref())
                .unwrap_or(DEFAULT_DEVICE)
                .to_string(),
        })
    }
}

impl AnalysisQuery {
    /// Task object for the ranking provider.
    pub fn task(&self) -> Value {
        serde_json::json!({
            "keyword": self.keyword,
            "location_code": self.location_code,
            "language_code": self.language_code,
            "device": self.device,
        })
    }
}

fn required_text(value: Option<&Value>, field: &str) -> Result<String, SeoError> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SeoError::Validation(format!("{field} is required and must be a non-empty string")))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Accept integers and integer strings; absent or null falls back to the default.
pub fn coerce_location_code(value: Option<&Value>, default: i64) -> Result<i64, SeoError> {
    let invalid = |v: &Value| SeoError::Validation(format!("location_code must be an integer, got {v}"));

    match value {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| invalid(&Value::Number(n.clone()))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(&Value::String(s.clone()))),
        Some(other) => Err(invalid(other)),
    }
}

// =============================================================================
// Report
// =============================================================================

/// Provider status codes echoed back for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub status_code: Option<i64>,
    pub status_message: Option<String>,
    pub task_status_code: Option<i64>,
    pub task_status_message: Option<String>,
}

impl From<&UpstreamResponse> for ProviderStatus {
    fn from(response: &UpstreamResponse) -> Self {
        let task = response.first_task();
        Self {
            status_code: response.status_code,
            status_message: response.status_message.clone(),
            task_status_code: task.and_then(|t| t.status_code),
            task_status_message: task.and_then(|t| t.status_message.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub domain: String,
    pub keyword: String,
    pub analysis: String,
    pub raw_data_snippet: Vec<ResultRecord>,
    pub df_status: ProviderStatus,
}

// =============================================================================
// Analyzer
// =============================================================================

pub struct Analyzer {
    config: Arc<Config>,
    serp: SerpClient,
    generator: Arc<dyn TextGenerator>,
}

impl Analyzer {
    pub fn new(config: Arc<Config>, serp: SerpClient, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            config,
            serp,
            generator,
        }
    }

    /// Validate, fetch rankings, normalize, then ask for a narrative.
    pub async fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisReport, SeoError> {
        let query = input.validate(self.config.default_location_code)?;

        let span = tracing::info_span!(
            "analysis",
            request_id = %Uuid::new_v4(),
            keyword = %query.keyword,
            domain = %query.domain,
        );
        self.run(query).instrument(span).await
    }

    async fn run(&self, query: AnalysisQuery) -> Result<AnalysisReport, SeoError> {
        let request = self.serp.request(ORGANIC_LIVE_ADVANCED, query.task());
        let response = self.serp.send(&request).await?;

        let mut records = extract_organic_results(&response);
        let found = records.len();
        records.truncate(SAMPLE_SIZE);
        info!(found, sampled = records.len(), "Organic results normalized");

        let analysis = self.narrate(&query, &records).await?;

        Ok(AnalysisReport {
            domain: query.domain,
            keyword: query.keyword,
            analysis,
            raw_data_snippet: records,
            df_status: ProviderStatus::from(&response),
        })
    }

    async fn narrate(&self, query: &AnalysisQuery, sample: &[ResultRecord]) -> Result<String, SeoError> {
        let messages = prompt::analysis_messages(query, sample);
        let (generator, messages) = (&self.generator, messages.as_slice());

        retry_with_backoff(&self.config.generation_retry_policy(), "text-generation", |_| async move {
            generator.generate(messages).await.map_err(GenerationAttempt)
        })
        .await
        .map_err(|RetryExhausted { attempts, error }| SeoError::Generation {
            message: error.0.to_string(),
            attempts,
        })
    }
}

/// Adapts provider errors to the retry loop.
struct GenerationAttempt(AiError);

impl fmt::Display for GenerationAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Retryable for GenerationAttempt {
    fn is_retriable(&self) -> bool {
        self.0.is_retriable()
    }
}
