use std::time::Duration;

use seo_common::RetryPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level status code the provider uses for success.
pub const SUCCESS_STATUS: i64 = 20000;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Request
// =============================================================================

/// One batch call to the provider. Fields are fixed at construction.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    endpoint: String,
    tasks: Vec<Value>,
    policy: RetryPolicy,
    timeout: Duration,
}

impl UpstreamRequest {
    pub fn new(endpoint: impl Into<String>, tasks: Vec<Value>) -> Self {
        Self {
            endpoint: endpoint.into(),
            tasks,
            policy: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn tasks(&self) -> &[Value] {
        &self.tasks
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Body the provider expects: `{"tasks": [...]}`.
    pub fn envelope(&self) -> Value {
        serde_json::json!({ "tasks": self.tasks })
    }
}

// =============================================================================
// Response
// =============================================================================

/// Decoded leniently from the raw body: fields with an unexpected type read as
/// absent, and a task entry that is not an object becomes an empty task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct UpstreamResponse {
    pub status_code: Option<i64>,
    pub status_message: Option<String>,
    pub tasks: Vec<TaskResult>,
}

/// Task-level codes are reported separately and need not mirror the top-level code.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskResult {
    pub status_code: Option<i64>,
    pub status_message: Option<String>,
    /// Provider-defined tree; shape varies across API versions.
    pub result: Option<Value>,
}

impl UpstreamResponse {
    pub fn from_value(value: &Value) -> Self {
        Self {
            status_code: status_code(value),
            status_message: status_message(value),
            tasks: value
                .get("tasks")
                .and_then(Value::as_array)
                .map(|tasks| tasks.iter().map(TaskResult::from_value).collect())
                .unwrap_or_default(),
        }
    }

    pub fn first_task(&self) -> Option<&TaskResult> {
        self.tasks.first()
    }
}

impl From<Value> for UpstreamResponse {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

impl TaskResult {
    pub fn from_value(value: &Value) -> Self {
        Self {
            status_code: status_code(value),
            status_message: status_message(value),
            result: value.get("result").filter(|r| !r.is_null()).cloned(),
        }
    }
}

fn status_code(value: &Value) -> Option<i64> {
    value.get("status_code").and_then(Value::as_i64)
}

fn status_message(value: &Value) -> Option<String> {
    value
        .get("status_message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

// =============================================================================
// Normalized records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub rank: Option<i64>,
    pub title: String,
    pub url: String,
    pub snippet: Option<String>,
}

impl ResultRecord {
    /// Map a raw provider item. Missing text fields become empty strings.
    pub fn from_item(item: &Value) -> Self {
        let text = |key: &str| item.get(key).and_then(|v| v.as_str()).map(str::to_string);

        Self {
            rank: item
                .get("rank_absolute")
                .and_then(|v| v.as_i64())
                .or_else(|| item.get("rank_group").and_then(|v| v.as_i64())),
            title: text("title").unwrap_or_default(),
            url: text("url").unwrap_or_default(),
            snippet: text("description").or_else(|| text("snippet")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_wraps_tasks() {
        let request = UpstreamRequest::new("serp/x", vec![json!({"keyword": "a"})]);
        assert_eq!(request.envelope(), json!({"tasks": [{"keyword": "a"}]}));
        assert_eq!(request.policy().max_attempts(), 4);
        assert_eq!(request.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn response_tolerates_null_and_missing_fields() {
        let response: UpstreamResponse =
            serde_json::from_value(json!({"status_code": 40101, "tasks": null})).unwrap();
        assert_eq!(response.status_code, Some(40101));
        assert!(response.tasks.is_empty());

        let response: UpstreamResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.status_code.is_none());
        assert!(response.first_task().is_none());
    }

    #[test]
    fn malformed_task_entries_become_empty_tasks() {
        let response = UpstreamResponse::from_value(&json!({
            "status_code": 20000,
            "tasks": [null, "task", { "status_code": "20000", "status_message": 7, "result": null }]
        }));
        assert_eq!(response.status_code, Some(20000));
        assert_eq!(response.tasks.len(), 3);
        for task in &response.tasks {
            assert!(task.status_code.is_none());
            assert!(task.status_message.is_none());
            assert!(task.result.is_none());
        }
    }

    #[test]
    fn non_object_body_reads_as_empty_response() {
        let response = UpstreamResponse::from_value(&json!([1, 2, 3]));
        assert!(response.status_code.is_none());
        assert!(response.tasks.is_empty());
    }

    #[test]
    fn record_prefers_absolute_rank_and_description() {
        let record = ResultRecord::from_item(&json!({
            "type": "organic",
            "rank_group": 2,
            "rank_absolute": 5,
            "title": "Shoes",
            "url": "https://example.com/shoes",
            "description": "Great shoes"
        }));
        assert_eq!(record.rank, Some(5));
        assert_eq!(record.title, "Shoes");
        assert_eq!(record.snippet.as_deref(), Some("Great shoes"));
    }

    #[test]
    fn record_from_sparse_item() {
        let record = ResultRecord::from_item(&json!({"rank_group": 3}));
        assert_eq!(record.rank, Some(3));
        assert_eq!(record.title, "");
        assert_eq!(record.url, "");
        assert!(record.snippet.is_none());
    }
}
