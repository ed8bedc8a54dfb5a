mod client;
pub(crate) mod types;

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::AiError;
use crate::traits::{Message, TextGenerator};
use client::{OpenAiClient, OPENAI_API_URL};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// =============================================================================
// OpenAi Generator
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: Option<String>,
    timeout: Duration,
    http: reqwest::Client,
}

impl OpenAi {
    /// An empty `api_key` is accepted here and reported as `AiError::Config` on first use.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> OpenAiClient {
        OpenAiClient::new(
            self.http.clone(),
            &self.api_key,
            self.base_url.as_deref().unwrap_or(OPENAI_API_URL),
            self.timeout,
        )
    }
}

#[async_trait]
impl TextGenerator for OpenAi {
    async fn generate(&self, messages: &[Message]) -> Result<String, AiError> {
        let request = types::ChatRequest::new(&self.model, messages);
        let response = self.client().chat(&request).await?;
        let text = response.into_text().ok_or(AiError::EmptyResponse)?;
        debug!(model = %self.model, chars = text.len(), "OpenAI completion received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_new() {
        let ai = OpenAi::new("sk-test", "gpt-4o");
        assert_eq!(ai.model(), "gpt-4o");
        assert_eq!(ai.api_key, "sk-test");
        assert_eq!(ai.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_openai_with_timeout() {
        let ai = OpenAi::new("sk-test", "gpt-4o").with_timeout(Duration::from_secs(5));
        assert_eq!(ai.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_openai_with_base_url() {
        let ai = OpenAi::new("sk-test", "gpt-4o").with_base_url("https://custom.api.com");
        assert_eq!(ai.base_url, Some("https://custom.api.com".to_string()));
    }

    #[tokio::test]
    async fn missing_key_is_a_config_error() {
        let ai = OpenAi::new("", "gpt-4o").with_base_url("http://127.0.0.1:9");
        let err = ai.generate(&[Message::user("u")]).await.unwrap_err();
        assert!(matches!(err, AiError::Config(_)));
        assert!(!err.is_retriable());
    }
}
