use std::time::Duration;

use crate::error::SeoError;
use crate::retry::RetryPolicy;

pub const DEFAULT_DATAFORSEO_BASE_URL: &str = "https://api.dataforseo.com/v3/";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
/// United States in the ranking provider's location table.
pub const DEFAULT_LOCATION_CODE: i64 = 2840;

/// Application configuration loaded from environment variables.
/// Built once at startup and shared by reference; nothing downstream
/// reads the environment directly.
#[derive(Debug, Clone)]
pub struct Config {
    // Ranking-data provider
    pub dataforseo_base_url: String,
    pub dataforseo_login: Option<String>,
    pub dataforseo_password: Option<String>,
    pub dataforseo_credentials: Option<String>,

    // Text generation
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,

    // Web server
    pub allowed_origin: Option<String>,
    pub web_host: String,
    pub web_port: u16,

    // Upstream call discipline
    pub serp_max_retries: u32,
    pub serp_retry_base: Duration,
    pub serp_timeout: Duration,
    pub generation_max_retries: u32,
    pub generation_retry_base: Duration,
    pub generation_timeout: Duration,

    pub default_location_code: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataforseo_base_url: DEFAULT_DATAFORSEO_BASE_URL.to_string(),
            dataforseo_login: None,
            dataforseo_password: None,
            dataforseo_credentials: None,
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_base_url: None,
            allowed_origin: None,
            web_host: "0.0.0.0".to_string(),
            web_port: 3000,
            serp_max_retries: 3,
            serp_retry_base: Duration::from_millis(1000),
            serp_timeout: Duration::from_secs(30),
            generation_max_retries: 3,
            generation_retry_base: Duration::from_millis(1000),
            generation_timeout: Duration::from_secs(60),
            default_location_code: DEFAULT_LOCATION_CODE,
        }
    }
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, SeoError> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    /// Build configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SeoError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            dataforseo_base_url: get("DATAFORSEO_BASE_URL").unwrap_or(defaults.dataforseo_base_url),
            dataforseo_login: get("DATAFORSEO_LOGIN"),
            dataforseo_password: get("DATAFORSEO_PASSWORD"),
            dataforseo_credentials: get("DATAFORSEO_CREDENTIALS"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: get("OPENAI_BASE_URL"),
            allowed_origin: get("ALLOWED_ORIGIN"),
            web_host: get("WEB_HOST").unwrap_or(defaults.web_host),
            web_port: parse_or("PORT", get("PORT"), defaults.web_port)?,
            serp_max_retries: parse_or("SERP_MAX_RETRIES", get("SERP_MAX_RETRIES"), defaults.serp_max_retries)?,
            serp_retry_base: Duration::from_millis(parse_or(
                "SERP_RETRY_BASE_MS",
                get("SERP_RETRY_BASE_MS"),
                defaults.serp_retry_base.as_millis() as u64,
            )?),
            serp_timeout: Duration::from_secs(parse_or(
                "SERP_TIMEOUT_SECS",
                get("SERP_TIMEOUT_SECS"),
                defaults.serp_timeout.as_secs(),
            )?),
            generation_max_retries: parse_or(
                "GENERATION_MAX_RETRIES",
                get("GENERATION_MAX_RETRIES"),
                defaults.generation_max_retries,
            )?,
            generation_retry_base: Duration::from_millis(parse_or(
                "GENERATION_RETRY_BASE_MS",
                get("GENERATION_RETRY_BASE_MS"),
                defaults.generation_retry_base.as_millis() as u64,
            )?),
            generation_timeout: Duration::from_secs(parse_or(
                "GENERATION_TIMEOUT_SECS",
                get("GENERATION_TIMEOUT_SECS"),
                defaults.generation_timeout.as_secs(),
            )?),
            default_location_code: parse_or(
                "DEFAULT_LOCATION_CODE",
                get("DEFAULT_LOCATION_CODE"),
                defaults.default_location_code,
            )?,
        })
    }

    pub fn serp_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.serp_max_retries, self.serp_retry_base)
    }

    pub fn generation_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.generation_max_retries, self.generation_retry_base)
    }

    fn log_keys(&self) {
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) => {
                    let n = v.char_indices().nth(4).map(|(i, _)| i).unwrap_or(v.len());
                    format!("{}...({} chars)", &v[..n], v.len())
                }
                None => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  DATAFORSEO_BASE_URL: {}", self.dataforseo_base_url);
        tracing::info!("  DATAFORSEO_LOGIN: {}", preview_opt(&self.dataforseo_login));
        tracing::info!("  DATAFORSEO_CREDENTIALS: {}", preview_opt(&self.dataforseo_credentials));
        tracing::info!("  OPENAI_API_KEY: {}", preview_opt(&self.openai_api_key));
        tracing::info!("  OPENAI_MODEL: {}", self.openai_model);
        tracing::info!("  ALLOWED_ORIGIN: {}", self.allowed_origin.as_deref().unwrap_or("*"));
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, SeoError> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| SeoError::Configuration(format!("{key} must be a number, got {raw:?}"))),
        None => Ok(default),
    }
}
