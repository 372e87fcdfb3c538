//! # Finwire Core
//!
//! Request execution layer for the finwire financial data client.
//!
//! ## Overview
//!
//! Every API call made through [`ApiClient`] passes through the same pipeline:
//!
//! - **Cache** returns a fresh stored response without touching the network
//! - **Rate limiter** admits the call against per-key minute and day windows
//! - **Retry manager** re-runs transient failures with backoff
//! - **Metrics collector** records timing, outcome, and error type
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | TTL cache with insertion-order eviction |
//! | [`client`] | Request executor and builder |
//! | [`config`] | Client configuration and environment loading |
//! | [`error`] | Client error type and retry classification |
//! | [`http_client`] | Transport abstraction and reqwest implementation |
//! | [`metrics`] | Request accounting and performance summaries |
//! | [`params`] | Query parameter encoding |
//! | [`rate_limit`] | Key-scoped fixed-window rate limiter |
//! | [`retry`] | Retry manager with fixed and exponential backoff |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use finwire_core::{ApiClient, CacheConfig, ClientConfig, QueryParams};
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::from_env()?.with_cache(CacheConfig::default());
//!     let client = ApiClient::new(config)?;
//!
//!     let quote: Value = client.get("quote/AAPL", QueryParams::new()).await?;
//!     println!("{quote}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Service call   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐  hit  ┌──────────────────┐
//! │  CacheStore     │──────▶│ decoded response │
//! └────────┬────────┘       └──────────────────┘
//!          │ miss
//!          ▼
//! ┌─────────────────┐
//! │  RateLimiter    │  (shared across clients, keyed by API key)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  RetryManager   │────▶│ HttpClient       │
//! └────────┬────────┘     │ (reqwest)        │
//!          │              └──────────────────┘
//!          ▼
//! ┌─────────────────┐
//! │ MetricsCollector│
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! All calls return [`ClientError`]:
//!
//! ```rust
//! use finwire_core::ClientError;
//!
//! fn describe(error: &ClientError) -> &'static str {
//!     match error {
//!         ClientError::RateLimited { .. } => "wait for the window to reset",
//!         ClientError::RetryExhausted { .. } => "upstream kept failing",
//!         ClientError::EmptyResult { .. } => "no data for this query",
//!         _ => "request failed",
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - The API key is sent only as the `apikey` query parameter
//! - `ClientConfig`'s `Debug` output redacts the key

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http_client;
pub mod metrics;
pub mod params;
pub mod rate_limit;
pub mod retry;

// Caching
pub use cache::{cache_key, CacheConfig, CacheMode, CacheStats, CacheStore};

// Executor
pub use client::{ApiClient, ApiClientBuilder, MaintenanceReport, RequestOptions};

// Configuration
pub use config::{ClientConfig, RateLimitWait};

// Error types
pub use error::{ClientError, Retryable};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpMethod, HttpRequest, HttpResponse,
    ReqwestHttpClient,
};

// Metrics
pub use metrics::{ApiMetrics, MetricsCollector, MetricsConfig, PerformanceSummary, RequestId};

// Query parameters
pub use params::QueryParams;

// Rate limiting
pub use rate_limit::{
    RateLimitConfig, RateLimitDecision, RateLimitUsage, RateLimiter, WindowKind,
};

// Retry logic
pub use retry::{retry, Backoff, BoxFuture, RetryConfig, RetryError, RetryManager};
