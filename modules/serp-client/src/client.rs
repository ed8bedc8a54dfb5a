use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use seo_common::{retry_with_backoff, Config, RetryExhausted, Retryable};
use tracing::{debug, info};

use crate::credential::{Credential, CredentialResolver};
use crate::error::{Result, SerpError};
use crate::types::{UpstreamRequest, UpstreamResponse, SUCCESS_STATUS};

/// Live Google organic SERP, advanced result shape.
pub const ORGANIC_LIVE_ADVANCED: &str = "serp/google/organic/live/advanced";

/// Longest body excerpt carried in failure messages.
const MAX_BODY_EXCERPT: usize = 500;

/// Ranking-data provider client. Retries transient failures with exponential backoff.
pub struct SerpClient {
    http: reqwest::Client,
    config: Arc<Config>,
    credential: OnceLock<Credential>,
}

impl SerpClient {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            credential: OnceLock::new(),
        }
    }

    /// Single-task request against `endpoint` using the configured retry budget and timeout.
    pub fn request(&self, endpoint: &str, task: serde_json::Value) -> UpstreamRequest {
        UpstreamRequest::new(endpoint, vec![task])
            .with_policy(self.config.serp_retry_policy())
            .with_timeout(self.config.serp_timeout)
    }

    /// POST the request's tasks, retrying until success or the budget runs out.
    /// Missing credentials fail immediately without touching the network.
    pub async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse> {
        let headers = headers(&self.credential()?)?;
        let url = self.endpoint_url(request.endpoint());
        let body = request.envelope();

        info!(
            endpoint = request.endpoint(),
            tasks = request.tasks().len(),
            max_attempts = request.policy().max_attempts(),
            "Sending ranking provider request"
        );

        let last_seen = LastSeen::default();
        let (url, body, headers, last_seen) = (url.as_str(), &body, &headers, &last_seen);
        let timeout = request.timeout();

        retry_with_backoff(request.policy(), request.endpoint(), |attempt| async move {
            self.attempt(url, headers, body, timeout, attempt)
                .await
                .map_err(|failure| last_seen.carry(failure))
        })
        .await
        .map_err(|RetryExhausted { attempts, error }| SerpError::Upstream {
            last_status: error.status_code,
            last_message: error.status_message,
            http_status: error.http_status,
            message: error.message,
            attempts,
            payload: error.payload,
        })
    }

    fn credential(&self) -> Result<Credential> {
        if let Some(credential) = self.credential.get() {
            return Ok(credential.clone());
        }
        let resolved = CredentialResolver::new(&self.config).resolve()?;
        Ok(self.credential.get_or_init(|| resolved).clone())
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.dataforseo_base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    async fn attempt(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: &serde_json::Value,
        timeout: Duration,
        attempt: u32,
    ) -> std::result::Result<UpstreamResponse, AttemptFailure> {
        debug!(url, attempt, "Ranking provider attempt");

        let response = self
            .http
            .post(url)
            .headers(headers.clone())
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(AttemptFailure::network)?;

        let http_status = response.status();
        let text = response.text().await.map_err(AttemptFailure::network)?;
        let payload = serde_json::from_str::<serde_json::Value>(&text).ok();

        if !http_status.is_success() {
            return Err(AttemptFailure::http(http_status, &text, payload));
        }

        let Some(payload) = payload else {
            return Err(AttemptFailure {
                retriable: true,
                http_status: Some(http_status.as_u16()),
                status_code: None,
                status_message: None,
                message: format!("Invalid JSON from provider: {}", excerpt(&text)),
                payload: None,
            });
        };

        let parsed = UpstreamResponse::from_value(&payload);

        // Logical rejections arrive with HTTP 200.
        if let Some(code) = parsed.status_code.filter(|code| *code != SUCCESS_STATUS) {
            return Err(AttemptFailure {
                retriable: true,
                http_status: Some(http_status.as_u16()),
                status_code: Some(code),
                status_message: parsed.status_message.clone(),
                message: format!(
                    "Provider rejected request ({code}): {}",
                    parsed.status_message.as_deref().unwrap_or("no message")
                ),
                payload: Some(payload),
            });
        }

        Ok(parsed)
    }
}

fn headers(credential: &Credential) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&credential.header_value()).map_err(|_| {
            SerpError::Configuration("credential contains characters not valid in a header".to_string())
        })?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

fn excerpt(text: &str) -> &str {
    if text.len() <= MAX_BODY_EXCERPT {
        return text;
    }
    let mut end = MAX_BODY_EXCERPT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// One failed attempt: network error, timeout, HTTP error, or logical rejection.
#[derive(Debug)]
struct AttemptFailure {
    retriable: bool,
    http_status: Option<u16>,
    status_code: Option<i64>,
    status_message: Option<String>,
    message: String,
    payload: Option<serde_json::Value>,
}

impl AttemptFailure {
    fn network(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("Request timed out: {err}")
        } else {
            format!("Network error: {err}")
        };
        Self {
            retriable: true,
            http_status: err.status().map(|s| s.as_u16()),
            status_code: None,
            status_message: None,
            message,
            payload: None,
        }
    }

    fn http(status: StatusCode, text: &str, payload: Option<serde_json::Value>) -> Self {
        let field = |key: &str| payload.as_ref().and_then(|p| p.get(key));
        Self {
            retriable: true,
            http_status: Some(status.as_u16()),
            status_code: field("status_code").and_then(|v| v.as_i64()),
            status_message: field("status_message")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            message: format!("HTTP {status}: {}", excerpt(text)),
            payload,
        }
    }
}

/// Most recent provider body seen across the attempts of one `send`.
#[derive(Default)]
struct LastSeen(Mutex<Option<Observation>>);

struct Observation {
    status_code: Option<i64>,
    status_message: Option<String>,
    payload: serde_json::Value,
}

impl LastSeen {
    /// Record a failure that carries a body; fill one that doesn't from the last body seen.
    fn carry(&self, mut failure: AttemptFailure) -> AttemptFailure {
        let mut last = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        match &failure.payload {
            Some(payload) => {
                *last = Some(Observation {
                    status_code: failure.status_code,
                    status_message: failure.status_message.clone(),
                    payload: payload.clone(),
                });
            }
            None => {
                if let Some(seen) = last.as_ref() {
                    failure.status_code = seen.status_code;
                    failure.status_message = seen.status_message.clone();
                    failure.payload = Some(seen.payload.clone());
                }
            }
        }
        failure
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Retryable for AttemptFailure {
    fn is_retriable(&self) -> bool {
        self.retriable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> SerpClient {
        let config = Config {
            dataforseo_base_url: base_url.to_string(),
            ..Config::default()
        };
        SerpClient::new(Arc::new(config))
    }

    #[test]
    fn endpoint_url_joins_without_double_slashes() {
        let c = client("https://api.dataforseo.com/v3/");
        assert_eq!(
            c.endpoint_url("/serp/google/organic/live/advanced"),
            "https://api.dataforseo.com/v3/serp/google/organic/live/advanced"
        );
        let c = client("http://localhost:9000");
        assert_eq!(c.endpoint_url("a/b"), "http://localhost:9000/a/b");
    }

    #[test]
    fn request_uses_configured_budget_and_timeout() {
        let config = Config {
            serp_max_retries: 1,
            serp_timeout: Duration::from_secs(5),
            ..Config::default()
        };
        let c = SerpClient::new(Arc::new(config));
        let request = c.request(ORGANIC_LIVE_ADVANCED, serde_json::json!({"keyword": "k"}));
        assert_eq!(request.policy().max_attempts(), 2);
        assert_eq!(request.timeout(), Duration::from_secs(5));
        assert_eq!(request.tasks().len(), 1);
    }

    #[test]
    fn every_http_failure_is_retriable() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN, StatusCode::BAD_GATEWAY] {
            assert!(AttemptFailure::http(status, "{}", None).is_retriable(), "{status}");
        }
    }

    #[test]
    fn last_seen_body_fills_later_bodiless_failures() {
        let last_seen = LastSeen::default();
        let rejected = serde_json::json!({"status_code": 40000, "status_message": "rejected"});
        let first = last_seen.carry(AttemptFailure {
            retriable: true,
            http_status: Some(200),
            status_code: Some(40000),
            status_message: Some("rejected".into()),
            message: "Provider rejected request".into(),
            payload: Some(rejected.clone()),
        });
        assert_eq!(first.payload, Some(rejected.clone()));

        let timeout = last_seen.carry(AttemptFailure {
            retriable: true,
            http_status: None,
            status_code: None,
            status_message: None,
            message: "Request timed out".into(),
            payload: None,
        });
        assert_eq!(timeout.message, "Request timed out");
        assert_eq!(timeout.http_status, None);
        assert_eq!(timeout.status_code, Some(40000));
        assert_eq!(timeout.status_message.as_deref(), Some("rejected"));
        assert_eq!(timeout.payload, Some(rejected));
    }

    #[test]
    fn http_failure_reads_provider_status_from_body() {
        let payload = serde_json::json!({"status_code": 50000, "status_message": "Internal Error."});
        let failure = AttemptFailure::http(
            StatusCode::INTERNAL_SERVER_ERROR,
            &payload.to_string(),
            Some(payload.clone()),
        );
        assert_eq!(failure.status_code, Some(50000));
        assert_eq!(failure.status_message.as_deref(), Some("Internal Error."));
        assert_eq!(failure.payload, Some(payload));
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let text = "é".repeat(400);
        let cut = excerpt(&text);
        assert!(cut.len() <= MAX_BODY_EXCERPT);
        assert!(text.starts_with(cut));
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        // Port 9 (discard) is never contacted: resolution fails first.
        let c = client("http://127.0.0.1:9");
        let request = c.request(ORGANIC_LIVE_ADVANCED, serde_json::json!({}));
        let err = c.send(&request).await.unwrap_err();
        assert!(matches!(err, SerpError::Configuration(_)));
    }
}
