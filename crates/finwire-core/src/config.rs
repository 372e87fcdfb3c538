//! Client configuration.

use std::fmt::{Debug, Formatter};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::error::ClientError;
use crate::metrics::MetricsConfig;
use crate::retry::RetryConfig;

pub const DEFAULT_BASE_URL: &str = "https://financialmodelingprep.com/api/v3";
pub const API_KEY_ENV: &str = "FINWIRE_API_KEY";
pub const BASE_URL_ENV: &str = "FINWIRE_BASE_URL";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Interval of the background cache and rate-limiter sweep.
pub const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(300);

/// What the executor does when the rate limiter rejects a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitWait {
    /// Sleep until the window resets and try again, indefinitely.
    #[default]
    Block,
    /// Keep waiting only while the total wait stays within the bound.
    Bounded(Duration),
    /// Return `ClientError::RateLimited` on the first rejection.
    FailFast,
}

/// Construction options for `ApiClient`.
///
/// `cache`, `retry` and `metrics` are opt-in: `None` disables the feature.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub cache: Option<CacheConfig>,
    pub retry: Option<RetryConfig>,
    pub metrics: Option<MetricsConfig>,
    pub rate_limit_wait: RateLimitWait,
}

impl Debug for ClientConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("cache", &self.cache)
            .field("retry", &self.retry)
            .field("metrics", &self.metrics)
            .field("rate_limit_wait", &self.rate_limit_wait)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: String::from(DEFAULT_BASE_URL),
            timeout: DEFAULT_TIMEOUT,
            cache: None,
            retry: None,
            metrics: None,
            rate_limit_wait: RateLimitWait::default(),
        }
    }

    /// Reads `FINWIRE_API_KEY` and the optional `FINWIRE_BASE_URL`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let api_key = lookup(API_KEY_ENV)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ClientError::config(format!("{API_KEY_ENV} is not set")))?;
        let mut config = Self::new(api_key);
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|value| !value.trim().is_empty()) {
            config.base_url = base_url;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_rate_limit_wait(mut self, wait: RateLimitWait) -> Self {
        self.rate_limit_wait = wait;
        self
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.api_key.trim().is_empty() {
            return Err(ClientError::config("api key must not be empty"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ClientError::config(format!(
                "base url must start with http:// or https://: '{}'",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(ClientError::config("timeout must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn optional_features_default_to_disabled() {
        let config = ClientConfig::new("key");

        assert!(config.cache.is_none());
        assert!(config.retry.is_none());
        assert!(config.metrics.is_none());
        assert_eq!(config.rate_limit_wait, RateLimitWait::Block);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn lookup_requires_api_key() {
        let error = ClientConfig::from_lookup(|_| None).expect_err("missing key");
        assert!(matches!(error, ClientError::Config(message) if message.contains(API_KEY_ENV)));
    }

    #[test]
    fn lookup_reads_key_and_base_url() {
        let vars = HashMap::from([
            (API_KEY_ENV, "secret"),
            (BASE_URL_ENV, "http://localhost:8080/api"),
        ]);

        let config =
            ClientConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).expect("valid");

        assert_eq!(config.api_key, "secret");
        assert_eq!(config.base_url, "http://localhost:8080/api");
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let rendered = format!("{:?}", ClientConfig::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(ClientConfig::new("  ").validate().is_err());
        assert!(ClientConfig::new("key")
            .with_base_url("ftp://example.test")
            .validate()
            .is_err());
        assert!(ClientConfig::new("key")
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }
}
