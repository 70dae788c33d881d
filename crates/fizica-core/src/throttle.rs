//! Process-wide request throttling for the chat-completion provider.
//!
//! Every outbound model call is funnelled through one [`RequestThrottle`].
//! The throttle admits a single task at a time in submission order, keeps
//! consecutive task starts at least `min_interval` apart, and retries a
//! task on rate-limit or transient network failures with jittered
//! exponential backoff. It is transparent otherwise: the caller gets the
//! task's value or the task's own final error, never a wrapper.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use fizica_core::error::AppError;
//! use fizica_core::throttle::{RequestThrottle, ThrottleConfig};
//!
//! # async fn run() -> Result<(), AppError> {
//! let throttle = RequestThrottle::new(
//!     ThrottleConfig::new(Duration::from_millis(1500))
//!         .with_max_retries(5)
//!         .with_base_delay(Duration::from_millis(800)),
//! );
//! let answer = throttle
//!     .run(|| async { Ok::<_, AppError>("42".to_string()) })
//!     .await?;
//! assert_eq!(answer, "42");
//! # Ok(())
//! # }
//! ```

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::Mutex;

use crate::error::{AppError, Classify};

/// Configuration for the request throttle. Immutable once the throttle is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Minimum spacing between the starts of two consecutive tasks.
    pub min_interval: Duration,

    /// Retries allowed per task after the first attempt.
    pub max_retries: u32,

    /// Backoff before the first retry; doubled for every further retry.
    pub base_delay: Duration,
}

impl ThrottleConfig {
    /// Create a config with the given spacing and default retry policy.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Un-jittered backoff before retry number `attempt` (1-indexed):
    /// `base_delay * 2^(attempt - 1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for ThrottleConfig {
    /// 1.5s spacing (about 40 calls per minute), 5 retries, 800ms base backoff.
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(1500),
            max_retries: 5,
            base_delay: Duration::from_millis(800),
        }
    }
}

/// Mutable timing state, guarded by the admission mutex.
#[derive(Debug, Default)]
struct ThrottleState {
    last_run_at: Option<Instant>,
}

/// Single-flight admission queue with spacing and retry/backoff.
///
/// Cloning is cheap and every clone shares the same queue, so all call
/// sites must hold clones of one instance (or use [`RequestThrottle::shared`]).
/// Separate instances do not space calls against each other.
#[derive(Clone, Debug)]
pub struct RequestThrottle {
    config: ThrottleConfig,
    /// tokio's mutex hands out the lock in request order, so waiting on it
    /// is the FIFO queue and holding it is the "running" flag.
    state: Arc<Mutex<ThrottleState>>,
    next_ticket: Arc<AtomicU64>,
    pending: Arc<AtomicUsize>,
}

static SHARED: OnceLock<RequestThrottle> = OnceLock::new();

impl RequestThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(ThrottleState::default())),
            next_ticket: Arc::new(AtomicU64::new(1)),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Install the process-wide throttle. Must happen once, before the
    /// first call to [`RequestThrottle::shared`].
    pub fn install(config: ThrottleConfig) -> Result<&'static RequestThrottle, AppError> {
        let mut installed = false;
        let throttle = SHARED.get_or_init(|| {
            installed = true;
            RequestThrottle::new(config)
        });
        if installed {
            tracing::info!(config = ?throttle.config, "Request throttle installed");
            Ok(throttle)
        } else {
            Err(AppError::ConfigError(
                "request throttle is already installed".into(),
            ))
        }
    }

    /// The process-wide throttle, created with defaults if none was installed.
    pub fn shared() -> &'static RequestThrottle {
        SHARED.get_or_init(|| RequestThrottle::new(ThrottleConfig::default()))
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Tasks admitted to the queue that have not settled yet (including the running one).
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Queue `task`, wait for its turn and the spacing interval, then run
    /// it with retries. Resolves exactly once with the task's outcome.
    ///
    /// `task` is called once per attempt, so it must be able to rebuild
    /// the outbound request each time.
    ///
    /// Dropping the returned future gives up its place in the queue. If the
    /// task was already dequeued it is aborted at its next await point,
    /// including any retries it had left: the in-flight attempt is
    /// abandoned and its result is never observed. Behind the HTTP server
    /// this means a client disconnect aborts the provider call. The next
    /// queued task still waits out the spacing interval from the aborted
    /// task's start.
    pub async fn run<T, E, F, Fut>(&self, mut task: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + Display,
    {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let _pending = PendingGuard::enter(&self.pending);

        let mut state = self.state.lock().await;

        if let Some(last) = state.last_run_at {
            let elapsed = last.elapsed();
            if elapsed < self.config.min_interval {
                let wait = self.config.min_interval - elapsed;
                tracing::debug!(ticket, wait_ms = %wait.as_millis(), "Spacing provider call");
                tokio::time::sleep(wait).await;
            }
        }

        // Spacing is measured between call starts, not completions.
        state.last_run_at = Some(Instant::now());

        let result = self.execute_with_retries(ticket, &mut task).await;
        drop(state);
        result
    }

    async fn execute_with_retries<T, E, F, Fut>(&self, ticket: u64, task: &mut F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + Display,
    {
        let mut attempt: u32 = 0;
        loop {
            let err = match task().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            attempt += 1;
            let class = err.class();
            if !class.is_retryable() {
                return Err(err);
            }
            if attempt > self.config.max_retries {
                tracing::warn!(ticket, attempts = attempt, error = %err, "Retries exhausted");
                return Err(err);
            }

            let delay = jitter(self.config.backoff_delay(attempt));
            tracing::warn!(
                ticket,
                attempt,
                ?class,
                delay_ms = %delay.as_millis(),
                error = %err,
                "Provider call failed, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Run `task` through the process-wide throttle.
///
/// Every module issuing a provider call outside of an injected
/// [`RequestThrottle`] must go through here.
pub async fn run_throttled<T, E, F, Fut>(task: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + Display,
{
    RequestThrottle::shared().run(task).await
}

/// Keeps the pending counter accurate even if the caller drops the future.
struct PendingGuard<'a>(&'a AtomicUsize);

impl<'a> PendingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Add up to 20% positive jitter: `delay + floor(random * delay * 0.2)`.
fn jitter(delay: Duration) -> Duration {
    let max_extra_ms = u64::try_from(delay.as_millis() / 5).unwrap_or(u64::MAX);
    if max_extra_ms == 0 {
        return delay;
    }
    delay.saturating_add(Duration::from_millis(
        rand::rng().random_range(0..=max_extra_ms),
    ))
}
