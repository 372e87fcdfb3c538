//! Request executor.
//!
//! Every call runs the same pipeline: cache lookup, rate-limit admission,
//! transport wrapped by the retry manager, cache population, and metrics
//! finalization. A cache hit ends the pipeline at the first step.

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::cache::{cache_key, CacheMode, CacheStats, CacheStore};
use crate::config::{ClientConfig, RateLimitWait, MAINTENANCE_INTERVAL};
use crate::error::ClientError;
use crate::http_client::{HttpClient, HttpMethod, HttpRequest, ReqwestHttpClient};
use crate::metrics::{ApiMetrics, MetricsCollector, PerformanceSummary, RequestId};
use crate::params::QueryParams;
use crate::rate_limit::{RateLimitUsage, RateLimiter};
use crate::retry::{RetryError, RetryManager};

/// Longest upstream body kept in a `ClientError::Status`.
const MAX_ERROR_BODY: usize = 512;

/// Per-call switches for the execution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestOptions {
    pub cache: CacheMode,
    /// Overrides the cache's default TTL for the stored response.
    pub cache_ttl: Option<Duration>,
    /// Skip rate-limit admission entirely for this call.
    pub skip_rate_limit: bool,
    /// Accept an empty JSON array instead of failing with `EmptyResult`.
    pub allow_empty: bool,
}

impl RequestOptions {
    pub fn bypass_cache(mut self) -> Self {
        self.cache = CacheMode::Bypass;
        self
    }

    pub fn refresh_cache(mut self) -> Self {
        self.cache = CacheMode::Refresh;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn skip_rate_limit(mut self) -> Self {
        self.skip_rate_limit = true;
        self
    }

    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }
}

/// Counts from one maintenance sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaintenanceReport {
    pub cache_entries_removed: usize,
    pub rate_limit_keys_removed: usize,
}

struct ClientInner {
    config: ClientConfig,
    http: Arc<dyn HttpClient>,
    cache: Option<CacheStore>,
    rate_limiter: Arc<RateLimiter>,
    retry: Option<RetryManager<ClientError>>,
    metrics: Option<MetricsCollector>,
    maintenance: Option<JoinHandle<()>>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(handle) = self.maintenance.take() {
            handle.abort();
        }
    }
}

impl ClientInner {
    async fn run_maintenance(&self) -> MaintenanceReport {
        let cache_entries_removed = match &self.cache {
            Some(cache) => cache.cleanup().await,
            None => 0,
        };
        let rate_limit_keys_removed = self.rate_limiter.cleanup();
        debug!(
            cache_entries_removed,
            rate_limit_keys_removed, "maintenance sweep finished"
        );
        MaintenanceReport {
            cache_entries_removed,
            rate_limit_keys_removed,
        }
    }
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    config: ClientConfig,
    http: Option<Arc<dyn HttpClient>>,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl ApiClientBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_config(ClientConfig::new(api_key))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            http: None,
            rate_limiter: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn cache(mut self, cache: crate::cache::CacheConfig) -> Self {
        self.config.cache = Some(cache);
        self
    }

    pub fn retry(mut self, retry: crate::retry::RetryConfig) -> Self {
        self.config.retry = Some(retry);
        self
    }

    pub fn metrics(mut self, metrics: crate::metrics::MetricsConfig) -> Self {
        self.config.metrics = Some(metrics);
        self
    }

    pub fn rate_limit_wait(mut self, wait: RateLimitWait) -> Self {
        self.config.rate_limit_wait = wait;
        self
    }

    /// Transport used for every request; defaults to [`ReqwestHttpClient`].
    pub fn http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Limiter to share with other clients; defaults to [`RateLimiter::process_default`].
    pub fn rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn build(self) -> Result<ApiClient, ClientError> {
        self.config.validate()?;
        let config = self.config;
        let http = self
            .http
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
        let rate_limiter = self
            .rate_limiter
            .unwrap_or_else(RateLimiter::process_default);
        let cache = config
            .cache
            .clone()
            .filter(|cache| cache.enabled)
            .map(CacheStore::new);
        let retry = config
            .retry
            .clone()
            .filter(|retry| retry.enabled)
            .map(RetryManager::new);
        let metrics = config
            .metrics
            .filter(|metrics| metrics.enabled)
            .map(MetricsCollector::new);

        let inner = Arc::new_cyclic(|weak: &Weak<ClientInner>| {
            let maintenance = spawn_maintenance(weak.clone());
            ClientInner {
                config,
                http,
                cache,
                rate_limiter,
                retry,
                metrics,
                maintenance,
            }
        });
        Ok(ApiClient { inner })
    }
}

/// Starts the periodic sweep when a tokio runtime is available.
fn spawn_maintenance(client: Weak<ClientInner>) -> Option<JoinHandle<()>> {
    let runtime = tokio::runtime::Handle::try_current().ok()?;
    Some(runtime.spawn(async move {
        let mut ticker =
            tokio::time::interval_at(Instant::now() + MAINTENANCE_INTERVAL, MAINTENANCE_INTERVAL);
        loop {
            ticker.tick().await;
            let Some(client) = client.upgrade() else {
                break;
            };
            client.run_maintenance().await;
        }
    }))
}

/// HTTP client that executes API calls through cache, rate limiter, retry, and metrics.
///
/// Cloning is cheap; clones share cache, metrics, and maintenance task.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        ApiClientBuilder::from_config(config).build()
    }

    pub fn builder(api_key: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder::new(api_key)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// GET `endpoint` with default options.
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: QueryParams,
    ) -> Result<T, ClientError> {
        self.get_with(endpoint, params, RequestOptions::default())
            .await
    }

    #[instrument(skip(self, params, options))]
    pub async fn get_with<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: QueryParams,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        self.execute(HttpMethod::Get, endpoint, params, None, options)
            .await
    }

    /// GET an endpoint that answers with a one-element array and unwrap that element.
    pub async fn get_first<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: QueryParams,
    ) -> Result<T, ClientError> {
        let items: Vec<T> = self.get(endpoint, params).await?;
        items
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::EmptyResult {
                endpoint: endpoint.to_string(),
            })
    }

    /// POST a JSON body. Responses to POST are never cached.
    #[instrument(skip(self, body, params))]
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        params: QueryParams,
    ) -> Result<T, ClientError> {
        let body = serde_json::to_string(body).map_err(|source| ClientError::Encode {
            endpoint: endpoint.to_string(),
            source,
        })?;
        self.execute(
            HttpMethod::Post,
            endpoint,
            params,
            Some(body),
            RequestOptions::default(),
        )
        .await
    }

    /// Runs independent requests one after another, stopping at the first failure.
    pub async fn batch<T, F, Fut>(
        &self,
        requests: impl IntoIterator<Item = F>,
    ) -> Result<Vec<T>, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut results = Vec::new();
        for request in requests {
            results.push(request().await?);
        }
        Ok(results)
    }

    /// Aggregate metrics, or `None` when metrics are disabled.
    pub fn metrics(&self) -> Option<ApiMetrics> {
        self.inner.metrics.as_ref().map(MetricsCollector::metrics)
    }

    pub fn performance_summary(&self) -> Option<PerformanceSummary> {
        self.inner
            .metrics
            .as_ref()
            .map(MetricsCollector::performance_summary)
    }

    pub fn metrics_collector(&self) -> Option<&MetricsCollector> {
        self.inner.metrics.as_ref()
    }

    pub fn reset_metrics(&self) {
        if let Some(metrics) = &self.inner.metrics {
            metrics.reset();
        }
    }

    /// Cache occupancy, or `None` when caching is disabled.
    pub async fn cache_stats(&self) -> Option<CacheStats> {
        match &self.inner.cache {
            Some(cache) => Some(cache.stats().await),
            None => None,
        }
    }

    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.inner.cache {
            cache.clear().await;
        }
    }

    /// Usage of this client's credential in the shared limiter.
    pub fn rate_limit_usage(&self) -> RateLimitUsage {
        self.inner.rate_limiter.usage(&self.inner.config.api_key)
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.inner.rate_limiter
    }

    /// Sweeps expired cache entries and idle rate-limit keys now.
    pub async fn run_maintenance(&self) -> MaintenanceReport {
        self.inner.run_maintenance().await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: QueryParams,
        body: Option<String>,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let cache = self
            .inner
            .cache
            .as_ref()
            .filter(|_| method == HttpMethod::Get && options.cache != CacheMode::Bypass);
        let key = cache.map(|_| cache_key(endpoint, &params));

        if let (Some(cache), Some(key)) = (cache, key.as_deref()) {
            if options.cache.reads() {
                if let Some(value) = cache.get(key).await {
                    debug!(endpoint, "cache hit");
                    let request_id = self.start_metric(endpoint, method);
                    let result = decode(endpoint, value);
                    self.finish_metric(request_id, &result, true);
                    return result;
                }
                debug!(endpoint, "cache miss");
            }
        }

        let request_id = self.start_metric(endpoint, method);
        let result = match self.fetch(method, endpoint, &params, body, options).await {
            Ok(value) => match (cache, key) {
                (Some(cache), Some(key)) => {
                    let decoded = decode(endpoint, value.clone());
                    if decoded.is_ok() {
                        cache.set(key, value, options.cache_ttl).await;
                    }
                    decoded
                }
                _ => decode(endpoint, value),
            },
            Err(error) => Err(error),
        };
        self.finish_metric(request_id, &result, false);
        result
    }

    async fn fetch(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: &QueryParams,
        body: Option<String>,
        options: RequestOptions,
    ) -> Result<Value, ClientError> {
        if !options.skip_rate_limit {
            self.acquire_rate_limit().await?;
        }

        let request = self.build_request(method, endpoint, params, body);
        let allow_empty = options.allow_empty;
        match &self.inner.retry {
            Some(retry) => {
                let request = &request;
                let this = self;
                retry
                    .execute(move || this.send_once(request.clone(), endpoint, allow_empty))
                    .await
                    .map_err(|error| match error {
                        RetryError::Exhausted { attempts, source } => ClientError::RetryExhausted {
                            attempts,
                            source: Box::new(source),
                        },
                        RetryError::Aborted(source) => source,
                    })
            }
            None => self.send_once(request, endpoint, allow_empty).await,
        }
    }

    async fn acquire_rate_limit(&self) -> Result<(), ClientError> {
        let started = Instant::now();
        loop {
            let decision = self
                .inner
                .rate_limiter
                .check_and_increment(&self.inner.config.api_key);
            if decision.allowed {
                return Ok(());
            }

            let retry_after = decision.retry_after.unwrap_or(Duration::from_secs(1));
            match self.inner.config.rate_limit_wait {
                RateLimitWait::Block => {}
                RateLimitWait::FailFast => return Err(ClientError::RateLimited { retry_after }),
                RateLimitWait::Bounded(max_wait) => {
                    if started.elapsed() + retry_after > max_wait {
                        return Err(ClientError::RateLimited { retry_after });
                    }
                }
            }

            warn!(
                window = decision.window.map(|window| window.as_str()),
                wait_ms = retry_after.as_millis() as u64,
                "rate limit reached; waiting for window reset"
            );
            tokio::time::sleep(retry_after).await;
        }
    }

    fn build_request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: &QueryParams,
        body: Option<String>,
    ) -> HttpRequest {
        let config = &self.inner.config;
        let query = params
            .clone()
            .with("apikey", &config.api_key)
            .to_query_string();
        let url = format!(
            "{}/{}?{}",
            config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/'),
            query
        );

        let request = HttpRequest::new(method, url)
            .with_header("accept", "application/json")
            .with_timeout(config.timeout);
        match body {
            Some(body) => request.with_json_body(body),
            None => request,
        }
    }

    async fn send_once(
        &self,
        request: HttpRequest,
        endpoint: &str,
        allow_empty: bool,
    ) -> Result<Value, ClientError> {
        let response = self.inner.http.execute(request).await?;

        if !response.is_success() {
            return Err(ClientError::Status {
                status: response.status,
                body: truncate(response.body, MAX_ERROR_BODY),
            });
        }
        if response.body.trim().is_empty() {
            return Err(ClientError::EmptyResult {
                endpoint: endpoint.to_string(),
            });
        }

        let value: Value =
            serde_json::from_str(&response.body).map_err(|source| ClientError::Decode {
                endpoint: endpoint.to_string(),
                source,
            })?;
        check_payload(endpoint, value, allow_empty)
    }

    fn start_metric(&self, endpoint: &str, method: HttpMethod) -> Option<RequestId> {
        self.inner
            .metrics
            .as_ref()
            .map(|metrics| metrics.start_request(endpoint, method))
    }

    fn finish_metric<T>(
        &self,
        request_id: Option<RequestId>,
        result: &Result<T, ClientError>,
        cached: bool,
    ) {
        let (Some(metrics), Some(request_id)) = (self.inner.metrics.as_ref(), request_id) else {
            return;
        };
        match result {
            Ok(_) => metrics.end_request(request_id, cached),
            Err(error) => metrics.end_request_with_error(request_id, &error.metric_label()),
        };
    }
}

/// Rejects empty arrays and error-shaped bodies.
fn check_payload(endpoint: &str, value: Value, allow_empty: bool) -> Result<Value, ClientError> {
    match &value {
        Value::Array(items) if items.is_empty() && !allow_empty => Err(ClientError::EmptyResult {
            endpoint: endpoint.to_string(),
        }),
        Value::Object(map) => {
            let message = ["Error Message", "error", "errorMessage"]
                .iter()
                .find_map(|field| map.get(*field).and_then(Value::as_str));
            match message {
                Some(message) => Err(ClientError::Api {
                    endpoint: endpoint.to_string(),
                    message: message.to_string(),
                }),
                None => Ok(value),
            }
        }
        _ => Ok(value),
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|source| ClientError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

fn truncate(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut cut = max;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}
