//! Behavior-driven tests for request metrics
//!
//! These tests verify HOW every request is finalized into the aggregate
//! counters, whatever way it ends.

use std::sync::Arc;
use std::time::Duration;

use finwire_core::{CacheConfig, ClientError, MetricsConfig, QueryParams, RateLimitWait};
use finwire_tests::{client_builder, client_builder_with_limiter, limiter, ScriptedHttpClient};
use serde_json::Value;

#[tokio::test(start_paused = true)]
async fn when_requests_succeed_and_fail_each_is_finalized_once() {
    // Given: A success, a client error, and another success
    let http = Arc::new(
        ScriptedHttpClient::new()
            .then_json(r#"{"v":1}"#)
            .then_status(401, "unauthorized")
            .then_json(r#"{"v":2}"#),
    );
    let client = client_builder(Arc::clone(&http))
        .metrics(MetricsConfig::default())
        .build()
        .expect("client");

    // When: Three requests run
    let _: Value = client.get("quote/AAPL", QueryParams::new()).await.expect("first");
    let failed: Result<Value, _> = client.get("profile/AAPL", QueryParams::new()).await;
    let _: Value = client.get("quote/AAPL", QueryParams::new()).await.expect("third");

    // Then: Totals add up and nothing is left in flight
    assert!(failed.is_err());
    let metrics = client.metrics().expect("metrics enabled");
    assert_eq!(metrics.total_requests, 3);
    assert_eq!(metrics.successful_requests, 2);
    assert_eq!(metrics.failed_requests, 1);
    assert_eq!(metrics.errors_by_type.get("http.401"), Some(&1));
    assert_eq!(metrics.requests_by_endpoint.get("quote/AAPL"), Some(&2));
    assert_eq!(metrics.requests_by_hour.values().sum::<u64>(), 3);
    assert!(metrics.last_request_at.is_some());
    let collector = client.metrics_collector().expect("metrics enabled");
    assert_eq!(collector.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn when_transport_has_latency_average_response_time_tracks_it() {
    let http = Arc::new(ScriptedHttpClient::always(r#"{"v":1}"#).with_latency(Duration::from_millis(200)));
    let client = client_builder(Arc::clone(&http))
        .metrics(MetricsConfig::default())
        .build()
        .expect("client");

    for endpoint in ["a", "b"] {
        let _: Value = client.get(endpoint, QueryParams::new()).await.expect("response");
    }

    let average = client.metrics().expect("metrics enabled").average_response_time_ms;
    assert!((199.0..=210.0).contains(&average), "average {average}");
}

#[tokio::test(start_paused = true)]
async fn when_summary_is_requested_rates_and_rankings_are_derived() {
    // Given: Two fetches of one endpoint, one cached repeat, and a failure
    let http = Arc::new(
        ScriptedHttpClient::new()
            .then_json(r#"{"v":1}"#)
            .then_json(r#"{"v":2}"#)
            .then_status(400, "bad"),
    );
    let client = client_builder(Arc::clone(&http))
        .cache(CacheConfig::default())
        .metrics(MetricsConfig::default())
        .build()
        .expect("client");

    let _: Value = client.get("quote/AAPL", QueryParams::new()).await.expect("fetch");
    let _: Value = client.get("quote/AAPL", QueryParams::new()).await.expect("cached");
    let _: Value = client.get("quote/MSFT", QueryParams::new()).await.expect("fetch");
    let _ = client.get::<Value>("quote/BAD", QueryParams::new()).await;
    tokio::time::advance(Duration::from_secs(60)).await;

    // When: The summary is derived
    let summary = client.performance_summary().expect("metrics enabled");

    // Then: Percentages and rankings reflect the history
    assert_eq!(summary.success_rate, 75.0);
    assert!((summary.cache_hit_rate - 100.0 / 3.0).abs() < 1e-9);
    assert!((summary.requests_per_minute - 4.0).abs() < 1e-6);
    assert_eq!(summary.top_endpoints[0], (String::from("quote/AAPL"), 2));
    assert_eq!(summary.top_errors, vec![(String::from("http.400"), 1)]);
}

#[tokio::test(start_paused = true)]
async fn when_rate_limit_rejects_request_failure_is_still_recorded() {
    let http = Arc::new(ScriptedHttpClient::always(r#"{"v":1}"#));
    let client = client_builder_with_limiter(Arc::clone(&http), limiter(1, 100))
        .rate_limit_wait(RateLimitWait::FailFast)
        .metrics(MetricsConfig::default())
        .build()
        .expect("client");

    let _: Value = client.get("a", QueryParams::new()).await.expect("first");
    let rejected = client.get::<Value>("b", QueryParams::new()).await;

    assert!(matches!(rejected, Err(ClientError::RateLimited { .. })));
    let metrics = client.metrics().expect("metrics enabled");
    assert_eq!(metrics.failed_requests, 1);
    assert_eq!(metrics.errors_by_type.get("rate_limited"), Some(&1));
}

#[tokio::test(start_paused = true)]
async fn when_metrics_are_reset_counters_start_over() {
    let http = Arc::new(ScriptedHttpClient::always(r#"{"v":1}"#));
    let client = client_builder(Arc::clone(&http))
        .metrics(MetricsConfig::default())
        .build()
        .expect("client");
    let _: Value = client.get("a", QueryParams::new()).await.expect("response");

    client.reset_metrics();

    assert_eq!(client.metrics().expect("metrics enabled").total_requests, 0);
}

#[tokio::test(start_paused = true)]
async fn when_metrics_are_not_configured_nothing_is_reported() {
    let http = Arc::new(ScriptedHttpClient::always(r#"{"v":1}"#));
    let client = client_builder(Arc::clone(&http)).build().expect("client");
    let _: Value = client.get("a", QueryParams::new()).await.expect("response");

    assert!(client.metrics().is_none());
    assert!(client.performance_summary().is_none());
}

#[tokio::test(start_paused = true)]
async fn when_metrics_are_exported_json_carries_timestamp_and_counters() {
    let http = Arc::new(ScriptedHttpClient::always(r#"{"v":1}"#));
    let client = client_builder(Arc::clone(&http))
        .metrics(MetricsConfig::default())
        .build()
        .expect("client");
    let _: Value = client.get("a", QueryParams::new()).await.expect("response");

    let exported = client
        .metrics_collector()
        .expect("metrics enabled")
        .export()
        .expect("export");
    let parsed: Value = serde_json::from_str(&exported).expect("valid json");

    assert!(parsed["exported_at"].as_str().is_some_and(|stamp| stamp.contains('T')));
    assert_eq!(parsed["metrics"]["total_requests"], 1);
    assert_eq!(parsed["summary"]["success_rate"], 100.0);
}
