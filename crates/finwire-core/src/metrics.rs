//! Request lifecycle metrics.
//!
//! In-flight requests live in a side map keyed by [`RequestId`] and are folded
//! into the aggregate [`ApiMetrics`] only when they finish. A request that never
//! finishes keeps counting toward `total_requests` but contributes nothing to
//! success, failure, or timing figures.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::time::Instant;
use tracing::trace;
use uuid::Uuid;

use crate::http_client::HttpMethod;

/// Metrics collection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Number of endpoints and errors listed in the performance summary.
    pub top_n: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top_n: 10,
        }
    }
}

/// Opaque handle for one tracked request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RequestId(Uuid);

impl RequestId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestOutcome {
    Success,
    Failure,
    CacheHit,
}

/// A request between `start_request` and its terminal call.
#[derive(Debug)]
pub(crate) struct RequestMetric {
    endpoint: String,
    method: HttpMethod,
    started_at: Instant,
}

impl RequestMetric {
    fn start(endpoint: &str, method: HttpMethod) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            method,
            started_at: Instant::now(),
        }
    }

    /// Finalizes the record and returns its response time.
    fn finish(self, outcome: RequestOutcome, error: Option<&str>) -> Duration {
        let elapsed = self.started_at.elapsed();
        trace!(
            endpoint = %self.endpoint,
            method = ?self.method,
            ?outcome,
            error,
            elapsed_ms = elapsed.as_millis() as u64,
            "request finished"
        );
        elapsed
    }
}

/// Aggregate request statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub average_response_time_ms: f64,
    pub requests_by_endpoint: BTreeMap<String, u64>,
    pub errors_by_type: BTreeMap<String, u64>,
    /// Requests started per UTC hour of day (0-23).
    pub requests_by_hour: BTreeMap<u8, u64>,
    #[serde(serialize_with = "serialize_rfc3339_opt")]
    pub last_request_at: Option<OffsetDateTime>,
}

/// Derived rates and rankings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    /// Successful requests as a percentage of all started requests.
    pub success_rate: f64,
    /// Cache hits as a percentage of completed successful requests.
    pub cache_hit_rate: f64,
    pub average_response_time_ms: f64,
    pub requests_per_minute: f64,
    pub top_endpoints: Vec<(String, u64)>,
    pub top_errors: Vec<(String, u64)>,
}

#[derive(Serialize)]
struct MetricsExport<'a> {
    #[serde(serialize_with = "serialize_rfc3339")]
    exported_at: OffsetDateTime,
    metrics: &'a ApiMetrics,
    summary: &'a PerformanceSummary,
}

#[derive(Debug)]
struct CollectorState {
    metrics: ApiMetrics,
    in_flight: HashMap<RequestId, RequestMetric>,
    started_at: Instant,
}

impl CollectorState {
    fn new() -> Self {
        Self {
            metrics: ApiMetrics::default(),
            in_flight: HashMap::new(),
            started_at: Instant::now(),
        }
    }
}

/// Collects per-request lifecycle events and derives aggregate statistics.
#[derive(Debug)]
pub struct MetricsCollector {
    config: MetricsConfig,
    state: Mutex<CollectorState>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}

impl MetricsCollector {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CollectorState::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CollectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> MetricsConfig {
        self.config
    }

    /// Begins tracking a request and counts it toward the totals.
    pub fn start_request(&self, endpoint: &str, method: HttpMethod) -> RequestId {
        let id = RequestId::new();
        let now = OffsetDateTime::now_utc();
        let mut state = self.lock();
        let metrics = &mut state.metrics;
        metrics.total_requests += 1;
        *metrics
            .requests_by_endpoint
            .entry(endpoint.to_string())
            .or_default() += 1;
        *metrics.requests_by_hour.entry(now.hour()).or_default() += 1;
        metrics.last_request_at = Some(now);
        state
            .in_flight
            .insert(id, RequestMetric::start(endpoint, method));
        id
    }

    /// Marks a request successful. Returns `false` for unknown or already finished ids.
    pub fn end_request(&self, id: RequestId, cached: bool) -> bool {
        let mut state = self.lock();
        let Some(request) = state.in_flight.remove(&id) else {
            return false;
        };
        let outcome = if cached {
            RequestOutcome::CacheHit
        } else {
            RequestOutcome::Success
        };
        let elapsed = request.finish(outcome, None);

        let metrics = &mut state.metrics;
        metrics.successful_requests += 1;
        if cached {
            metrics.cache_hits += 1;
        } else {
            metrics.cache_misses += 1;
        }
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let count = metrics.successful_requests as f64;
        metrics.average_response_time_ms += (elapsed_ms - metrics.average_response_time_ms) / count;
        true
    }

    /// Marks a request failed and counts `error` under its message.
    pub fn end_request_with_error(&self, id: RequestId, error: &str) -> bool {
        let mut state = self.lock();
        let Some(request) = state.in_flight.remove(&id) else {
            return false;
        };
        request.finish(RequestOutcome::Failure, Some(error));

        let metrics = &mut state.metrics;
        metrics.failed_requests += 1;
        *metrics.errors_by_type.entry(error.to_string()).or_default() += 1;
        true
    }

    /// Requests started but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// Deep copy of the aggregate counters.
    pub fn metrics(&self) -> ApiMetrics {
        self.lock().metrics.clone()
    }

    pub fn performance_summary(&self) -> PerformanceSummary {
        let state = self.lock();
        let metrics = &state.metrics;

        let success_rate = percentage(metrics.successful_requests, metrics.total_requests);
        let cache_hit_rate =
            percentage(metrics.cache_hits, metrics.cache_hits + metrics.cache_misses);
        let minutes = state.started_at.elapsed().as_secs_f64() / 60.0;
        let requests_per_minute = if minutes > 0.0 {
            metrics.total_requests as f64 / minutes
        } else {
            0.0
        };

        PerformanceSummary {
            success_rate,
            cache_hit_rate,
            average_response_time_ms: metrics.average_response_time_ms,
            requests_per_minute,
            top_endpoints: top_n(&metrics.requests_by_endpoint, self.config.top_n),
            top_errors: top_n(&metrics.errors_by_type, self.config.top_n),
        }
    }

    /// Clears every counter and forgets in-flight requests.
    pub fn reset(&self) {
        *self.lock() = CollectorState::new();
    }

    /// Serializes the aggregate metrics and summary with an export timestamp.
    pub fn export(&self) -> Result<String, serde_json::Error> {
        let metrics = self.metrics();
        let summary = self.performance_summary();
        serde_json::to_string_pretty(&MetricsExport {
            exported_at: OffsetDateTime::now_utc(),
            metrics: &metrics,
            summary: &summary,
        })
    }
}

fn serialize_rfc3339<S: Serializer>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&formatted)
}

fn serialize_rfc3339_opt<S: Serializer>(
    value: &Option<OffsetDateTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serialize_rfc3339(value, serializer),
        None => serializer.serialize_none(),
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn top_n(counts: &BTreeMap<String, u64>, n: usize) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = counts
        .iter()
        .map(|(name, count)| (name.clone(), *count))
        .collect();
    // BTreeMap iteration is name-ordered, so the stable sort breaks ties by name.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(n);
    ranked
}
