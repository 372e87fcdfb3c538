//! Credential-scoped request quotas shared by every client in the process.
//!
//! Each credential key owns two fixed windows, one per minute and one per day.
//! A request is admitted only when both windows have room, and both counters are
//! bumped under the same lock that performed the check.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Callback invoked with the wait time whenever a request is rejected.
pub type LimitExceededHook = Arc<dyn Fn(Duration) + Send + Sync>;

/// Process-wide quota settings.
#[derive(Clone)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub requests_per_day: u32,
    pub enabled: bool,
    pub on_limit_exceeded: Option<LimitExceededHook>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 300,
            requests_per_day: 10_000,
            enabled: true,
            on_limit_exceeded: None,
        }
    }
}

impl Debug for RateLimitConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitConfig")
            .field("requests_per_minute", &self.requests_per_minute)
            .field("requests_per_day", &self.requests_per_day)
            .field("enabled", &self.enabled)
            .field("on_limit_exceeded", &self.on_limit_exceeded.is_some())
            .finish()
    }
}

impl RateLimitConfig {
    pub fn new(requests_per_minute: u32, requests_per_day: u32) -> Self {
        Self {
            requests_per_minute,
            requests_per_day,
            ..Self::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_on_limit_exceeded(
        mut self,
        hook: impl Fn(Duration) + Send + Sync + 'static,
    ) -> Self {
        self.on_limit_exceeded = Some(Arc::new(hook));
        self
    }
}

/// Accounting window kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowKind {
    Minute,
    Day,
}

impl WindowKind {
    pub const fn length(self) -> Duration {
        match self {
            Self::Minute => Duration::from_secs(60),
            Self::Day => Duration::from_secs(86_400),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Day => "day",
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Time until the rejecting window resets; `None` when allowed.
    pub retry_after: Option<Duration>,
    /// Window that rejected the request.
    pub window: Option<WindowKind>,
}

impl RateLimitDecision {
    pub const fn allowed() -> Self {
        Self {
            allowed: true,
            retry_after: None,
            window: None,
        }
    }

    pub const fn rejected(window: WindowKind, retry_after: Duration) -> Self {
        Self {
            allowed: false,
            retry_after: Some(retry_after),
            window: Some(window),
        }
    }

    /// Wait time rounded up to whole seconds.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after.map(|wait| {
            let secs = wait.as_secs();
            if wait.subsec_nanos() > 0 {
                secs + 1
            } else {
                secs
            }
        })
    }
}

/// Read-only usage snapshot for one credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitUsage {
    pub minute_usage: u32,
    pub minute_limit: u32,
    pub day_usage: u32,
    pub day_limit: u32,
    pub minute_resets_in: Option<Duration>,
    pub day_resets_in: Option<Duration>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

impl Window {
    fn open(now: Instant, kind: WindowKind) -> Self {
        Self {
            count: 0,
            reset_at: now + kind.length(),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.reset_at
    }

    fn roll(&mut self, now: Instant, kind: WindowKind) {
        if self.is_expired(now) {
            *self = Self::open(now, kind);
        }
    }

    /// Usage as seen at `now`, treating an expired window as empty.
    fn observe(&self, now: Instant) -> (u32, Option<Duration>) {
        if self.is_expired(now) {
            (0, None)
        } else {
            (self.count, Some(self.reset_at - now))
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct KeyWindows {
    minute: Window,
    day: Window,
}

impl KeyWindows {
    fn open(now: Instant) -> Self {
        Self {
            minute: Window::open(now, WindowKind::Minute),
            day: Window::open(now, WindowKind::Day),
        }
    }
}

#[derive(Debug, Default)]
struct LimiterState {
    config: RateLimitConfig,
    windows: HashMap<String, KeyWindows>,
}

/// Fixed-window limiter keyed by credential.
///
/// Share one instance between clients (wrap it in an `Arc`) to enforce a
/// single quota per credential across all of them.
#[derive(Debug, Default)]
pub struct RateLimiter {
    state: Mutex<LimiterState>,
}

static PROCESS_DEFAULT: OnceLock<Arc<RateLimiter>> = OnceLock::new();

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            state: Mutex::new(LimiterState {
                config,
                windows: HashMap::new(),
            }),
        }
    }

    /// Limiter shared by every client that was not given one explicitly.
    pub fn process_default() -> Arc<Self> {
        Arc::clone(PROCESS_DEFAULT.get_or_init(|| Arc::new(Self::default())))
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the limits; existing counters are kept and judged against the new limits.
    pub fn configure(&self, config: RateLimitConfig) {
        debug!(
            requests_per_minute = config.requests_per_minute,
            requests_per_day = config.requests_per_day,
            enabled = config.enabled,
            "configuring rate limiter"
        );
        self.lock().config = config;
    }

    pub fn config(&self) -> RateLimitConfig {
        self.lock().config.clone()
    }

    /// Admits the request for `key` if both windows have room, consuming one slot in each.
    pub fn check_and_increment(&self, key: &str) -> RateLimitDecision {
        let (decision, hook) = {
            let mut state = self.lock();
            if !state.config.enabled {
                return RateLimitDecision::allowed();
            }

            let now = Instant::now();
            let per_minute = state.config.requests_per_minute;
            let per_day = state.config.requests_per_day;
            let windows = state
                .windows
                .entry(key.to_string())
                .or_insert_with(|| KeyWindows::open(now));
            windows.minute.roll(now, WindowKind::Minute);
            windows.day.roll(now, WindowKind::Day);

            let decision = if windows.minute.count >= per_minute {
                RateLimitDecision::rejected(WindowKind::Minute, windows.minute.reset_at - now)
            } else if windows.day.count >= per_day {
                RateLimitDecision::rejected(WindowKind::Day, windows.day.reset_at - now)
            } else {
                windows.minute.count += 1;
                windows.day.count += 1;
                RateLimitDecision::allowed()
            };

            let hook = if decision.allowed {
                None
            } else {
                state.config.on_limit_exceeded.clone()
            };
            (decision, hook)
        };

        if let (Some(window), Some(retry_after)) = (decision.window, decision.retry_after) {
            debug!(
                window = window.as_str(),
                retry_after_ms = retry_after.as_millis() as u64,
                "rate limit window exhausted"
            );
            if let Some(hook) = hook {
                hook(retry_after);
            }
        }
        decision
    }

    /// Current usage for `key` without mutating any counter.
    pub fn usage(&self, key: &str) -> RateLimitUsage {
        let state = self.lock();
        let now = Instant::now();
        let (minute, day) = match state.windows.get(key) {
            Some(windows) => (windows.minute.observe(now), windows.day.observe(now)),
            None => ((0, None), (0, None)),
        };
        RateLimitUsage {
            minute_usage: minute.0,
            minute_limit: state.config.requests_per_minute,
            day_usage: day.0,
            day_limit: state.config.requests_per_day,
            minute_resets_in: minute.1,
            day_resets_in: day.1,
        }
    }

    /// Drops keys whose windows have all expired. Returns how many keys were removed.
    pub fn cleanup(&self) -> usize {
        let mut state = self.lock();
        let now = Instant::now();
        let before = state.windows.len();
        state
            .windows
            .retain(|_, windows| !(windows.minute.is_expired(now) && windows.day.is_expired(now)));
        let removed = before - state.windows.len();
        if removed > 0 {
            debug!(removed, "swept idle rate limit keys");
        }
        removed
    }

    /// Forgets every counter.
    pub fn reset(&self) {
        self.lock().windows.clear();
    }

    /// Number of credential keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.lock().windows.len()
    }
}
