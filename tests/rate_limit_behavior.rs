//! Behavior-driven tests for rate-limit admission
//!
//! These tests verify HOW the client waits for, fails on, or skips the shared
//! per-key minute and day windows.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use finwire_core::{ApiClient, ClientError, QueryParams, RateLimitConfig, RateLimiter, RequestOptions};
use finwire_tests::{
    client_builder_with_limiter, limiter, RateLimitWait, ScriptedHttpClient, TEST_BASE_URL,
};
use serde_json::Value;
use tokio::time::Instant;

async fn get(client: &ApiClient, endpoint: &str) -> Result<Value, ClientError> {
    client.get(endpoint, QueryParams::new()).await
}

// =============================================================================
// Waiting modes
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_minute_window_is_full_blocking_client_waits_for_reset() {
    // Given: One request per minute and the default blocking behavior
    let http = Arc::new(ScriptedHttpClient::always(r#"{"ok":true}"#));
    let client = client_builder_with_limiter(Arc::clone(&http), limiter(1, 100))
        .build()
        .expect("client");
    let started = Instant::now();

    // When: Two requests are made back to back
    get(&client, "quote/AAPL").await.expect("first");
    get(&client, "quote/MSFT").await.expect("second");

    // Then: The second one waited for the minute window to roll over
    assert!(started.elapsed() >= Duration::from_secs(60));
    assert!(started.elapsed() < Duration::from_secs(62));
    assert_eq!(http.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn when_limit_is_reached_fail_fast_client_reports_rate_limited() {
    // Given: Two requests per minute and fail-fast admission
    let http = Arc::new(ScriptedHttpClient::always(r#"{"ok":true}"#));
    let client = client_builder_with_limiter(Arc::clone(&http), limiter(2, 100))
        .rate_limit_wait(RateLimitWait::FailFast)
        .build()
        .expect("client");

    // When: A third request arrives within the same minute
    get(&client, "a").await.expect("first");
    get(&client, "b").await.expect("second");
    let third = get(&client, "c").await;

    // Then: It is rejected with a positive wait and never hits the transport
    match third {
        Err(ClientError::RateLimited { retry_after }) => {
            assert!(retry_after > Duration::ZERO);
            assert!(retry_after <= Duration::from_secs(60));
        }
        other => panic!("expected rate limit rejection, got {other:?}"),
    }
    assert_eq!(http.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn when_reset_exceeds_bounded_wait_client_gives_up() {
    // Given: A 5 second wait budget against a one-per-minute limit
    let http = Arc::new(ScriptedHttpClient::always(r#"{"ok":true}"#));
    let client = client_builder_with_limiter(Arc::clone(&http), limiter(1, 100))
        .rate_limit_wait(RateLimitWait::Bounded(Duration::from_secs(5)))
        .build()
        .expect("client");
    get(&client, "a").await.expect("first");
    let started = Instant::now();

    // When: A second request needs about a minute of waiting
    let second = get(&client, "b").await;

    // Then: It fails immediately instead of sleeping past the budget
    assert!(matches!(second, Err(ClientError::RateLimited { .. })));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn when_reset_fits_bounded_wait_client_sleeps_and_proceeds() {
    let http = Arc::new(ScriptedHttpClient::always(r#"{"ok":true}"#));
    let client = client_builder_with_limiter(Arc::clone(&http), limiter(1, 100))
        .rate_limit_wait(RateLimitWait::Bounded(Duration::from_secs(90)))
        .build()
        .expect("client");

    get(&client, "a").await.expect("first");
    get(&client, "b").await.expect("second after wait");

    assert_eq!(http.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn when_daily_quota_is_spent_rejection_waits_for_day_window() {
    // Given: A generous minute limit but only two requests per day
    let http = Arc::new(ScriptedHttpClient::always(r#"{"ok":true}"#));
    let client = client_builder_with_limiter(Arc::clone(&http), limiter(100, 2))
        .rate_limit_wait(RateLimitWait::FailFast)
        .build()
        .expect("client");

    // When: The quota is exhausted
    get(&client, "a").await.expect("first");
    get(&client, "b").await.expect("second");
    let third = get(&client, "c").await;

    // Then: The wait points at the day window, not the minute window
    match third {
        Err(ClientError::RateLimited { retry_after }) => {
            assert!(retry_after > Duration::from_secs(3600));
        }
        other => panic!("expected daily rejection, got {other:?}"),
    }
}

// =============================================================================
// Sharing and opt-outs
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_clients_share_a_key_they_share_the_window() {
    // Given: Two clients with the same key over one limiter
    let shared = limiter(2, 100);
    let http = Arc::new(ScriptedHttpClient::always(r#"{"ok":true}"#));
    let first = client_builder_with_limiter(Arc::clone(&http), Arc::clone(&shared))
        .rate_limit_wait(RateLimitWait::FailFast)
        .build()
        .expect("first client");
    let second = client_builder_with_limiter(Arc::clone(&http), Arc::clone(&shared))
        .rate_limit_wait(RateLimitWait::FailFast)
        .build()
        .expect("second client");

    // When: They alternate requests
    get(&first, "a").await.expect("1");
    get(&second, "b").await.expect("2");
    let third = get(&first, "c").await;

    // Then: The combined count trips the limit
    assert!(matches!(third, Err(ClientError::RateLimited { .. })));
    assert_eq!(first.rate_limit_usage().minute_usage, 2);
    assert_eq!(second.rate_limit_usage().minute_usage, 2);
}

#[tokio::test(start_paused = true)]
async fn when_keys_differ_windows_are_independent() {
    let shared = limiter(1, 100);
    let http = Arc::new(ScriptedHttpClient::always(r#"{"ok":true}"#));
    let first = client_builder_with_limiter(Arc::clone(&http), Arc::clone(&shared))
        .rate_limit_wait(RateLimitWait::FailFast)
        .build()
        .expect("first client");
    let other = ApiClient::builder("another-key")
        .base_url(TEST_BASE_URL)
        .http_client(Arc::clone(&http) as Arc<dyn finwire_core::HttpClient>)
        .rate_limiter(Arc::clone(&shared))
        .rate_limit_wait(RateLimitWait::FailFast)
        .build()
        .expect("other client");

    get(&first, "a").await.expect("first key");
    get(&other, "a").await.expect("second key");

    assert_eq!(shared.tracked_keys(), 2);
}

#[tokio::test(start_paused = true)]
async fn when_request_skips_rate_limit_window_is_untouched() {
    // Given: A one-per-minute fail-fast client
    let http = Arc::new(ScriptedHttpClient::always(r#"{"ok":true}"#));
    let client = client_builder_with_limiter(Arc::clone(&http), limiter(1, 100))
        .rate_limit_wait(RateLimitWait::FailFast)
        .build()
        .expect("client");

    // When: Several requests opt out of admission
    for _ in 0..3 {
        let _: Value = client
            .get_with(
                "quote/AAPL",
                QueryParams::new(),
                RequestOptions::default().skip_rate_limit(),
            )
            .await
            .expect("skipped admission");
    }

    // Then: All succeed and nothing is counted
    assert_eq!(http.request_count(), 3);
    assert_eq!(client.rate_limit_usage().minute_usage, 0);
}

#[tokio::test(start_paused = true)]
async fn when_limit_is_hit_configured_hook_observes_the_wait() {
    // Given: A limiter whose hook counts rejections
    let rejections = Arc::new(AtomicU32::new(0));
    let observed = Arc::clone(&rejections);
    let config = RateLimitConfig::new(1, 100).with_on_limit_exceeded(move |retry_after| {
        assert!(retry_after > Duration::ZERO);
        observed.fetch_add(1, Ordering::SeqCst);
    });
    let http = Arc::new(ScriptedHttpClient::always(r#"{"ok":true}"#));
    let client = client_builder_with_limiter(Arc::clone(&http), Arc::new(RateLimiter::new(config)))
        .rate_limit_wait(RateLimitWait::FailFast)
        .build()
        .expect("client");

    // When: The second request is rejected
    get(&client, "a").await.expect("first");
    let _ = get(&client, "b").await;

    // Then: The hook fired once
    assert_eq!(rejections.load(Ordering::SeqCst), 1);
}
