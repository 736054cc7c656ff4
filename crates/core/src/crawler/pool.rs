//! Rate-limited worker pool for discovery fetches.
//!
//! Admission is bounded two ways at once: a semaphore caps the number of
//! in-flight tasks and a shared pacing ticker enforces a minimum spacing
//! between task starts. Retry/backoff policy lives here so every fetch in
//! the pipeline behaves the same way.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::error::FetchError;

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum tasks in flight at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Minimum spacing between task starts (milliseconds).
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,

    /// Retry attempts for rate-limited/transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay (milliseconds); doubles per attempt.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_max_concurrency() -> usize {
    5
}

fn default_request_interval_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            request_interval_ms: default_request_interval_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl PoolConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Bounded iterative retry with exponential backoff.
///
/// Retries `RateLimited` and `Transient` errors with delay
/// `retry_delay * 2^attempt`; `Fatal` errors and retry exhaustion surface
/// to the caller.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "fetch succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.retry_delay * 2u32.pow(attempt);
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "retryable fetch error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Outcome tally of one `WorkerPool::run` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolSummary {
    /// Units whose task eventually returned Ok.
    pub succeeded: usize,
    /// Units that exhausted their retries.
    pub failed: usize,
    /// Units abandoned on a fatal error (no retry).
    pub abandoned: usize,
    /// Units never admitted because shutdown fired first.
    pub skipped: usize,
}

impl PoolSummary {
    pub fn merge(&mut self, other: &PoolSummary) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.abandoned += other.abandoned;
        self.skipped += other.skipped;
    }
}

enum TaskOutcome {
    Succeeded,
    Failed,
    Abandoned,
}

/// Fixed-size pool of paced workers drawing from a queue of discovery units.
pub struct WorkerPool {
    config: PoolConfig,
    semaphore: Arc<Semaphore>,
    pacer: Arc<Mutex<Interval>>,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Self {
        let mut ticker = interval(Duration::from_millis(config.request_interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            pacer: Arc::new(Mutex::new(ticker)),
            config,
        }
    }

    /// Run `task` for every unit under the pool's limits.
    ///
    /// Once `shutdown` fires no further units are admitted; tasks already
    /// in flight drain normally (cancellation is advisory, never forced).
    pub async fn run<T, F, Fut>(
        &self,
        units: Vec<T>,
        mut shutdown: broadcast::Receiver<()>,
        task: F,
    ) -> PoolSummary
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(T) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<(), FetchError>> + Send + 'static,
    {
        let mut join_set: JoinSet<TaskOutcome> = JoinSet::new();
        let mut summary = PoolSummary::default();
        let total = units.len();
        let mut admitted = 0usize;

        for unit in units {
            if !self.wait_for_slot(&mut shutdown).await {
                warn!(admitted, total, "shutdown requested, draining in-flight tasks");
                break;
            }

            let permit = Arc::clone(&self.semaphore)
                .acquire_owned()
                .await
                .expect("worker pool semaphore closed");
            let policy = self.config.retry_policy();
            let task = task.clone();
            admitted += 1;

            join_set.spawn(async move {
                let _permit = permit;
                match policy.run(|| task(unit.clone())).await {
                    Ok(()) => TaskOutcome::Succeeded,
                    Err(e) if e.is_retryable() => {
                        warn!(error = %e, "unit failed after exhausting retries");
                        TaskOutcome::Failed
                    }
                    Err(e) => {
                        warn!(error = %e, "unit abandoned");
                        TaskOutcome::Abandoned
                    }
                }
            });
        }

        summary.skipped = total - admitted;

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(TaskOutcome::Succeeded) => summary.succeeded += 1,
                Ok(TaskOutcome::Failed) => summary.failed += 1,
                Ok(TaskOutcome::Abandoned) => summary.abandoned += 1,
                Err(e) => {
                    warn!(error = %e, "worker task join error");
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Wait for the next pacing tick. Returns false if shutdown fired first.
    async fn wait_for_slot(&self, shutdown: &mut broadcast::Receiver<()>) -> bool {
        let mut pacer = self.pacer.lock().await;
        tokio::select! {
            biased;
            msg = shutdown.recv() => match msg {
                // Channel closed without a signal: shutdown can no longer
                // fire, keep pacing normally.
                Err(broadcast::error::RecvError::Closed) => {
                    pacer.tick().await;
                    true
                }
                _ => false,
            },
            _ = pacer.tick() => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn fast_config(max_retries: u32, retry_delay_ms: u64) -> PoolConfig {
        PoolConfig {
            max_concurrency: 4,
            request_interval_ms: 1,
            max_retries,
            retry_delay_ms,
        }
    }

    fn no_shutdown() -> (broadcast::Sender<()>, broadcast::Receiver<()>) {
        broadcast::channel(1)
    }

    #[test]
    fn test_config_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.max_concurrency, 5);
        assert_eq!(config.request_interval_ms, 1000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay_ms, 2000);
    }

    #[tokio::test]
    async fn test_all_units_succeed() {
        let pool = WorkerPool::new(fast_config(3, 1));
        let (_tx, rx) = no_shutdown();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&counter);
        let summary = pool
            .run((0..10).collect(), rx, move |_unit: u32| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert_eq!(summary.succeeded, 10);
        assert_eq!(summary.failed, 0);
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_rate_limited_retries_until_success() {
        // Fails with RateLimited three times, succeeds on the 4th attempt.
        let pool = WorkerPool::new(fast_config(4, 20));
        let (_tx, rx) = no_shutdown();
        let attempts = Arc::new(AtomicUsize::new(0));

        let a = Arc::clone(&attempts);
        let start = Instant::now();
        let summary = pool
            .run(vec![0u32], rx, move |_unit| {
                let a = Arc::clone(&a);
                async move {
                    if a.fetch_add(1, Ordering::SeqCst) < 3 {
                        Err(FetchError::RateLimited)
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert_eq!(summary.succeeded, 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        // Cumulative backoff: 20ms * (1 + 2 + 4)
        assert!(start.elapsed() >= Duration::from_millis(140));
    }

    #[tokio::test]
    async fn test_retries_exhausted_counts_failed() {
        let pool = WorkerPool::new(fast_config(2, 1));
        let (_tx, rx) = no_shutdown();
        let attempts = Arc::new(AtomicUsize::new(0));

        let a = Arc::clone(&attempts);
        let summary = pool
            .run(vec![0u32], rx, move |_unit| {
                let a = Arc::clone(&a);
                async move {
                    a.fetch_add(1, Ordering::SeqCst);
                    Err(FetchError::Transient("connection reset".to_string()))
                }
            })
            .await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 0);
        // Initial attempt plus two retries
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_abandoned_without_retry() {
        let pool = WorkerPool::new(fast_config(3, 1));
        let (_tx, rx) = no_shutdown();
        let attempts = Arc::new(AtomicUsize::new(0));

        let a = Arc::clone(&attempts);
        let summary = pool
            .run(vec![0u32], rx, move |_unit| {
                let a = Arc::clone(&a);
                async move {
                    a.fetch_add(1, Ordering::SeqCst);
                    Err(FetchError::Fatal("missing expected field".to_string()))
                }
            })
            .await;

        assert_eq!(summary.abandoned, 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_skips_unadmitted_units() {
        let pool = WorkerPool::new(fast_config(3, 1));
        let (tx, rx) = no_shutdown();
        tx.send(()).unwrap();

        let summary = pool
            .run((0..5).collect(), rx, move |_unit: u32| async move { Ok(()) })
            .await;

        assert_eq!(summary.skipped, 5);
        assert_eq!(summary.succeeded, 0);
    }

    #[tokio::test]
    async fn test_max_concurrency_respected() {
        let config = PoolConfig {
            max_concurrency: 2,
            request_interval_ms: 1,
            max_retries: 0,
            retry_delay_ms: 1,
        };
        let pool = WorkerPool::new(config);
        let (_tx, rx) = no_shutdown();

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let f = Arc::clone(&in_flight);
        let p = Arc::clone(&peak);
        let summary = pool
            .run((0..8).collect(), rx, move |_unit: u32| {
                let f = Arc::clone(&f);
                let p = Arc::clone(&p);
                async move {
                    let now = f.fetch_add(1, Ordering::SeqCst) + 1;
                    p.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    f.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert_eq!(summary.succeeded, 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_pacing_spaces_task_starts() {
        let config = PoolConfig {
            max_concurrency: 8,
            request_interval_ms: 40,
            max_retries: 0,
            retry_delay_ms: 1,
        };
        let pool = WorkerPool::new(config);
        let (_tx, rx) = no_shutdown();

        let start = Instant::now();
        let summary = pool
            .run((0..3).collect(), rx, move |_unit: u32| async move { Ok(()) })
            .await;

        assert_eq!(summary.succeeded, 3);
        // First tick is immediate, the next two are spaced 40ms apart
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_retry_policy_fatal_passthrough() {
        let policy = RetryPolicy {
            max_retries: 5,
            retry_delay: Duration::from_millis(1),
        };
        let calls = AtomicUsize::new(0);

        let result: Result<(), FetchError> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FetchError::Fatal("nope".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(FetchError::Fatal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
