use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeoError {
    /// Missing or unusable secrets. Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed caller input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Ranking-data provider failed after the retry budget was spent.
    #[error("Upstream error after {attempts} attempt(s): {message}")]
    Upstream {
        message: String,
        last_status: Option<i64>,
        last_message: Option<String>,
        http_status: Option<u16>,
        attempts: u32,
        payload: Option<serde_json::Value>,
    },

    /// Text-generation provider failed after the retry budget was spent.
    #[error("Generation error after {attempts} attempt(s): {message}")]
    Generation { message: String, attempts: u32 },
}

impl SeoError {
    /// Diagnostic detail for error bodies: the last upstream payload when one was observed.
    pub fn details(&self) -> serde_json::Value {
        match self {
            SeoError::Upstream {
                message,
                last_status,
                last_message,
                http_status,
                attempts,
                payload,
            } => serde_json::json!({
                "message": message,
                "last_status": last_status,
                "last_message": last_message,
                "http_status": http_status,
                "attempts": attempts,
                "payload": payload,
            }),
            SeoError::Generation { message, attempts } => serde_json::json!({
                "message": message,
                "attempts": attempts,
            }),
            SeoError::Configuration(msg) | SeoError::Validation(msg) => {
                serde_json::Value::String(msg.clone())
            }
        }
    }
}
