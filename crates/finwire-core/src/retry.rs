//! Bounded retries for transient failures.

use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::error::Retryable;

/// Upper bound of the random delay added to exponential backoff.
pub const MAX_JITTER: Duration = Duration::from_millis(1000);

/// Wait between two attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same wait before every retry.
    Fixed { delay: Duration },
    /// `min(base * factor^attempt + jitter, max)`, with `jitter` drawn from `0..=MAX_JITTER`.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Wait before the retry that follows failed attempt `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt.min(i32::MAX as u32) as i32);
                let mut millis = base.as_millis() as f64 * scale;
                if jitter {
                    millis += fastrand::u64(0..=MAX_JITTER.as_millis() as u64) as f64;
                }
                let capped = millis.min(max.as_millis() as f64);
                Duration::from_millis(capped.max(0.0) as u64)
            }
        }
    }
}

/// Retry policy. An operation runs at most `max_retries + 1` times.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// `false` runs the operation exactly once.
    pub enabled: bool,
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            enabled: false,
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

/// Failure returned by [`RetryManager::execute`].
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every permitted attempt failed with a retryable error.
    #[error("operation failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },
    /// The operation failed with an error the retry condition rejected.
    #[error(transparent)]
    Aborted(E),
}

impl<E> RetryError<E> {
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
            Self::Aborted(_) => 1,
        }
    }

    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { source, .. } | Self::Aborted(source) => source,
        }
    }
}

pub type RetryCondition<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
pub type RetryHook<E> = Arc<dyn Fn(&E, u32) + Send + Sync>;
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Runs fallible async operations with bounded retries.
pub struct RetryManager<E> {
    config: RetryConfig,
    retry_condition: RetryCondition<E>,
    on_retry: Option<RetryHook<E>>,
}

impl<E> Clone for RetryManager<E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            retry_condition: Arc::clone(&self.retry_condition),
            on_retry: self.on_retry.clone(),
        }
    }
}

impl<E> Debug for RetryManager<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryManager")
            .field("config", &self.config)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl<E: Retryable + 'static> RetryManager<E> {
    /// Retries whatever the error type reports as retryable.
    pub fn new(config: RetryConfig) -> Self {
        Self::with_condition(config, |error: &E| error.is_retryable())
    }
}

impl<E: Retryable + 'static> Default for RetryManager<E> {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl<E> RetryManager<E> {
    pub fn with_condition(
        config: RetryConfig,
        condition: impl Fn(&E) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            config,
            retry_condition: Arc::new(condition),
            on_retry: None,
        }
    }

    pub fn with_retry_condition(
        mut self,
        condition: impl Fn(&E) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.retry_condition = Arc::new(condition);
        self
    }

    /// Registers a callback invoked with the error and the 1-based retry number before each sleep.
    pub fn with_on_retry(mut self, hook: impl Fn(&E, u32) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Arc::new(hook));
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Runs `operation` up to `max_retries + 1` times.
    ///
    /// Errors rejected by the retry condition are returned at once as
    /// [`RetryError::Aborted`]; a retryable error on the last attempt becomes
    /// [`RetryError::Exhausted`].
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.config.enabled {
            return operation().await.map_err(RetryError::Aborted);
        }

        let max_retries = self.config.max_retries;
        let mut attempt: u32 = 0;
        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !(self.retry_condition)(&error) {
                return Err(RetryError::Aborted(error));
            }
            if attempt >= max_retries {
                return Err(RetryError::Exhausted {
                    attempts: attempt + 1,
                    source: error,
                });
            }

            let delay = self.config.delay_for_attempt(attempt);
            if let Some(hook) = &self.on_retry {
                hook(&error, attempt + 1);
            }
            warn!(
                retry = attempt + 1,
                max_retries,
                delay_ms = delay.as_millis() as u64,
                "retrying after transient failure"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Lifts `f` into a function with the same argument that retries on failure.
    pub fn wrap<A, T, F, Fut>(self, f: F) -> impl Fn(A) -> BoxFuture<'static, Result<T, RetryError<E>>>
    where
        A: Clone + Send + Sync + 'static,
        T: Send + 'static,
        E: Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let manager = Arc::new(self);
        let f = Arc::new(f);
        move |args: A| -> BoxFuture<'static, Result<T, RetryError<E>>> {
            let manager = Arc::clone(&manager);
            let f = Arc::clone(&f);
            Box::pin(async move { manager.execute(move || (*f)(args.clone())).await })
        }
    }
}

/// One-shot helper: retry `operation` under `config` using the error's own retry rules.
pub async fn retry<T, E, F, Fut>(config: RetryConfig, operation: F) -> Result<T, RetryError<E>>
where
    E: Retryable + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    RetryManager::new(config).execute(operation).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Error, Clone, PartialEq, Eq)]
    enum TestError {
        #[error("transient")]
        Transient,
        #[error("fatal")]
        Fatal,
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, Self::Transient)
        }
    }

    fn quick(max_retries: u32) -> RetryConfig {
        RetryConfig::fixed(Duration::from_millis(10), max_retries)
    }

    #[test]
    fn fixed_delay_ignores_attempt_number() {
        let backoff = Backoff::Fixed {
            delay: Duration::from_millis(250),
        };

        for attempt in [0, 1, 7, u32::MAX] {
            assert_eq!(backoff.delay(attempt), Duration::from_millis(250));
        }
    }

    #[test]
    fn exponential_delay_doubles_until_cap() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(50),
            factor: 2.0,
            max: Duration::from_millis(300),
            jitter: false,
        };

        let delays: Vec<u64> = (0..5)
            .map(|attempt| backoff.delay(attempt).as_millis() as u64)
            .collect();
        assert_eq!(delays, [50, 100, 200, 300, 300]);
    }

    #[test]
    fn jitter_stays_within_one_second_and_under_cap() {
        let backoff = Backoff::default();

        for _ in 0..20 {
            for attempt in 0..6 {
                let delay = backoff.delay(attempt).as_millis() as u64;
                let floor = 1000 * 2_u64.pow(attempt);
                assert!(delay >= floor.min(30_000), "attempt={attempt}, delay={delay}");
                assert!(delay <= (floor + 1000).min(30_000), "attempt={attempt}, delay={delay}");
            }
        }
        assert_eq!(backoff.delay(40), Duration::from_secs(30));
    }

    #[test]
    fn constructors_set_expected_policy() {
        let default = RetryConfig::default();
        assert!(default.enabled);
        assert_eq!(default.max_retries, 3);
        assert_eq!(default.backoff, Backoff::default());

        let fixed = RetryConfig::fixed(Duration::from_millis(500), 2);
        assert!(fixed.enabled);
        assert_eq!(fixed.max_retries, 2);
        assert_eq!(fixed.delay_for_attempt(3), Duration::from_millis(500));

        let off = RetryConfig::no_retry();
        assert!(!off.enabled);
        assert_eq!(off.max_retries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_operation_runs_once() {
        let calls = &AtomicU32::new(0);
        let manager = RetryManager::<TestError>::new(quick(5));

        let result = manager
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TestError>(42)
            })
            .await;

        assert_eq!(result.expect("succeeds"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_failure_exhausts_all_attempts() {
        let calls = &AtomicU32::new(0);
        let manager = RetryManager::<TestError>::new(quick(3));

        let result: Result<(), _> = manager
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Transient)
            })
            .await;

        let error = result.expect_err("always fails");
        assert!(error.is_exhausted());
        assert_eq!(error.attempts(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(error.into_inner(), TestError::Transient);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_failure_short_circuits() {
        let calls = &AtomicU32::new(0);
        let manager = RetryManager::<TestError>::new(quick(3));

        let result: Result<(), _> = manager
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Fatal)
            })
            .await;

        let error = result.expect_err("fails");
        assert!(matches!(error, RetryError::Aborted(TestError::Fatal)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let calls = &AtomicU32::new(0);
        let manager = RetryManager::<TestError>::new(quick(3));

        let result = manager
            .execute(move || async move {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                if call < 2 {
                    Err(TestError::Transient)
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.expect("third call succeeds"), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn on_retry_fires_before_each_sleep() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let manager = RetryManager::<TestError>::new(quick(2)).with_on_retry(move |_, retry| {
            recorder.lock().expect("recorder lock").push(retry);
        });

        let _: Result<(), _> = manager.execute(|| async { Err(TestError::Transient) }).await;

        assert_eq!(*seen.lock().expect("recorder lock"), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_delays_are_slept() {
        let manager = RetryManager::<TestError>::new(RetryConfig {
            backoff: Backoff::Exponential {
                base: Duration::from_millis(100),
                factor: 2.0,
                max: Duration::from_secs(10),
                jitter: false,
            },
            ..RetryConfig::exponential(3)
        });

        let started = tokio::time::Instant::now();
        let _: Result<(), _> = manager.execute(|| async { Err(TestError::Transient) }).await;

        // 100 + 200 + 400
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(700), "elapsed={elapsed:?}");
        assert!(elapsed < Duration::from_millis(710), "elapsed={elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn custom_condition_overrides_error_rules() {
        let calls = &AtomicU32::new(0);
        let manager =
            RetryManager::<TestError>::new(quick(2)).with_retry_condition(|_| true);

        let _: Result<(), _> = manager
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Fatal)
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_config_runs_once_and_passes_error_through() {
        let calls = &AtomicU32::new(0);
        let manager = RetryManager::<TestError>::new(RetryConfig::no_retry());

        let result: Result<(), _> = manager
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Transient)
            })
            .await;

        assert!(matches!(result, Err(RetryError::Aborted(TestError::Transient))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn wrapped_function_keeps_its_argument() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let fetch = RetryManager::<TestError>::new(quick(2)).wrap(move |symbol: String| {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(TestError::Transient)
                } else {
                    Ok(format!("{symbol}:ok"))
                }
            }
        });

        let value = fetch(String::from("AAPL")).await.expect("second try works");

        assert_eq!(value, "AAPL:ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn free_function_uses_error_rules() {
        let result: Result<(), RetryError<TestError>> =
            retry(quick(1), || async { Err(TestError::Transient) }).await;

        assert_eq!(result.expect_err("fails").attempts(), 2);
    }
}
