use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use seo_common::Config;

use crate::error::{Result, SerpError};

/// Basic-scheme token for the ranking-data provider. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Full `Authorization` header value.
    pub fn header_value(&self) -> String {
        format!("Basic {}", self.0)
    }
}

// Keep the secret out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} chars>)", self.0.len())
    }
}

/// Derives the provider credential from configuration. First match wins:
/// a login/password pair, then a precomputed token.
pub struct CredentialResolver<'a> {
    config: &'a Config,
}

impl<'a> CredentialResolver<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn resolve(&self) -> Result<Credential> {
        if let (Some(login), Some(password)) = (
            self.config.dataforseo_login.as_deref(),
            self.config.dataforseo_password.as_deref(),
        ) {
            let encoded = STANDARD.encode(format!("{login}:{password}"));
            return Ok(Credential(encoded));
        }

        if let Some(raw) = self.config.dataforseo_credentials.as_deref() {
            let token = strip_scheme(raw.trim());
            if !token.is_empty() {
                return Ok(Credential(token.to_string()));
            }
        }

        Err(SerpError::Configuration(
            "DataForSEO credentials missing: set DATAFORSEO_LOGIN and DATAFORSEO_PASSWORD, or DATAFORSEO_CREDENTIALS"
                .to_string(),
        ))
    }
}

/// Drop a leading `Basic ` scheme, case-insensitively.
fn strip_scheme(raw: &str) -> &str {
    match (raw.get(..5), raw.get(5..)) {
        (Some(scheme), Some(rest))
            if scheme.eq_ignore_ascii_case("basic")
                && (rest.is_empty() || rest.starts_with(char::is_whitespace)) =>
        {
            rest.trim_start()
        }
        _ => raw,
    }
}
