use seo_common::SeoError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SerpError>;

#[derive(Debug, Error)]
pub enum SerpError {
    /// No usable credential source. Raised before any request is made.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Every attempt failed. `payload` is the last response body the provider returned, if any.
    /// `last_status` is the provider's own code; `http_status` belongs to the final attempt.
    #[error("Upstream error after {attempts} attempt(s): {message}")]
    Upstream {
        message: String,
        last_status: Option<i64>,
        last_message: Option<String>,
        http_status: Option<u16>,
        attempts: u32,
        payload: Option<serde_json::Value>,
    },
}

impl From<SerpError> for SeoError {
    fn from(err: SerpError) -> Self {
        match err {
            SerpError::Configuration(msg) => SeoError::Configuration(msg),
            SerpError::Upstream {
                message,
                last_status,
                last_message,
                http_status,
                attempts,
                payload,
            } => SeoError::Upstream {
                message,
                last_status,
                last_message,
                http_status,
                attempts,
                payload,
            },
        }
    }
}
