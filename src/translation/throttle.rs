/*!
 * Request throttling for provider calls.
 *
 * Each provider in a run gets its own `ProviderThrottle`: a semaphore that
 * bounds concurrent calls and a slot reservation that spaces calls out to
 * the provider's requests-per-minute. All throttles of a run share one
 * `RequestCounter`. Nothing here is global; the pipeline creates and owns
 * these objects for the duration of a run.
 */

use log::trace;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

/// Run-wide request statistics, updated atomically
#[derive(Debug, Default)]
pub struct RequestCounter {
    started: AtomicU64,
    failed: AtomicU64,
}

impl RequestCounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_start(&self) -> u64 {
        self.started.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    /// Requests sent so far
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    /// Requests that ended in an error
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Concurrency and rate limit for one provider
#[derive(Debug)]
pub struct ProviderThrottle {
    semaphore: Semaphore,
    // @field: Minimum spacing between request starts, 0 when unlimited
    min_interval_ms: u64,
    // @field: Earliest start of the next request, in ms since `epoch`
    next_slot_ms: AtomicU64,
    epoch: Instant,
    counter: Arc<RequestCounter>,
}

impl ProviderThrottle {
    /// Create a throttle allowing `max_concurrent` calls in flight and at
    /// most `requests_per_minute` call starts per minute
    pub fn new(max_concurrent: usize, requests_per_minute: Option<u32>, counter: Arc<RequestCounter>) -> Self {
        let min_interval_ms = match requests_per_minute {
            Some(rpm) if rpm > 0 => 60_000 / rpm as u64,
            _ => 0,
        };

        Self {
            semaphore: Semaphore::new(max_concurrent.max(1)),
            min_interval_ms,
            next_slot_ms: AtomicU64::new(0),
            epoch: Instant::now(),
            counter,
        }
    }

    /// Spacing between request starts
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Reserve the next start slot and return how long to wait for it
    fn reserve_slot(&self) -> Duration {
        if self.min_interval_ms == 0 {
            return Duration::ZERO;
        }

        let now = self.epoch.elapsed().as_millis() as u64;
        let interval = self.min_interval_ms;
        let previous = self
            .next_slot_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| Some(next.max(now) + interval))
            .unwrap_or(now);

        Duration::from_millis(previous.max(now) - now)
    }

    /// Wait for a concurrency permit and a rate slot.
    ///
    /// The permit must be held for the duration of the provider call.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        let permit = self.semaphore.acquire().await?;

        let wait = self.reserve_slot();
        if !wait.is_zero() {
            trace!("Throttling request for {:?}", wait);
            tokio::time::sleep(wait).await;
        }

        self.counter.record_start();
        Ok(permit)
    }

    pub fn counter(&self) -> &Arc<RequestCounter> {
        &self.counter
    }
}
