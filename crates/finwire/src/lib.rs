//! # Finwire
//!
//! Typed service groups over the finwire request executor.
//!
//! [`Finwire`] owns one [`ApiClient`] and hands out borrowed service groups.
//! Every group call goes through the client's cache, rate limiter, retry
//! manager, and metrics collector.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use finwire::{ClientConfig, Finwire, Period};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let finwire = Finwire::with_defaults(ClientConfig::from_env()?)?;
//!
//!     let quote = finwire.quotes().quote("AAPL").await?;
//!     let income = finwire
//!         .statements()
//!         .income_statements("AAPL", Period::Quarter, Some(4))
//!         .await?;
//!
//!     println!("{} at {:.2}, {} reports", quote.symbol, quote.price, income.len());
//!     Ok(())
//! }
//! ```

mod api;
pub mod services;
pub mod types;

pub use api::JsonApi;
pub use services::{
    AnalystService, CalendarService, CompanyService, CryptoService, EsgService, ForexService,
    InsiderService, MarketService, QuoteService, StatementService,
};
pub use types::Period;

pub use finwire_core::{
    ApiClient, ApiClientBuilder, CacheConfig, ClientConfig, ClientError, MetricsConfig,
    QueryParams, RateLimitWait, RequestOptions, RetryConfig,
};

use tracing::debug;

/// Entry point bundling one executor with every service group.
#[derive(Debug, Clone)]
pub struct Finwire {
    client: ApiClient,
}

impl Finwire {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Builds a client from `config` as given. Features without a config
    /// block stay disabled.
    pub fn with_config(config: ClientConfig) -> Result<Self, ClientError> {
        debug!(base_url = %config.base_url, "creating finwire client");
        Ok(Self::new(ApiClient::new(config)?))
    }

    /// Like [`Finwire::with_config`], but fills any missing cache, retry, or
    /// metrics block with its default.
    pub fn with_defaults(config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_config(ClientConfig {
            cache: config.cache.or_else(|| Some(CacheConfig::default())),
            retry: config.retry.or_else(|| Some(RetryConfig::default())),
            metrics: config.metrics.or_else(|| Some(MetricsConfig::default())),
            ..config
        })
    }

    /// Reads `FINWIRE_API_KEY` and optional `FINWIRE_BASE_URL` from the environment.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::with_config(ClientConfig::from_env()?)
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn quotes(&self) -> QuoteService<'_, ApiClient> {
        QuoteService::new(&self.client)
    }

    pub fn company(&self) -> CompanyService<'_, ApiClient> {
        CompanyService::new(&self.client)
    }

    pub fn statements(&self) -> StatementService<'_, ApiClient> {
        StatementService::new(&self.client)
    }

    pub fn analyst(&self) -> AnalystService<'_, ApiClient> {
        AnalystService::new(&self.client)
    }

    pub fn crypto(&self) -> CryptoService<'_, ApiClient> {
        CryptoService::new(&self.client)
    }

    pub fn forex(&self) -> ForexService<'_, ApiClient> {
        ForexService::new(&self.client)
    }

    pub fn insider(&self) -> InsiderService<'_, ApiClient> {
        InsiderService::new(&self.client)
    }

    pub fn esg(&self) -> EsgService<'_, ApiClient> {
        EsgService::new(&self.client)
    }

    pub fn market(&self) -> MarketService<'_, ApiClient> {
        MarketService::new(&self.client)
    }

    pub fn calendar(&self) -> CalendarService<'_, ApiClient> {
        CalendarService::new(&self.client)
    }
}
