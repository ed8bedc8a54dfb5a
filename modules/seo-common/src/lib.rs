pub mod config;
pub mod error;
pub mod retry;

pub use config::Config;
pub use error::SeoError;
pub use retry::{retry_with_backoff, RetryExhausted, RetryPolicy, Retryable};
