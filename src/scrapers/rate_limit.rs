//! Token-bucket admission control shared by every worker of a run.
//!
//! The bucket holds at most `R` tokens (`R` = requests per second) and
//! starts full. A background task adds one token every `1/R`; a refill that
//! finds the bucket full is dropped, so idle time never builds up a burst
//! larger than `R`. Above [`MAX_REFILLS_PER_SEC`] the task ticks less often
//! and adds a batch of tokens per tick, keeping the same rate.
//!
//! Tokens are permits of a [`Semaphore`]. Only the refill task ever adds
//! permits, and it checks the count first, so the bucket cannot exceed its
//! capacity; the semaphore itself guarantees a permit is handed to exactly
//! one waiter.

use crate::error::ScrapeError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Refill ticks per second, at most. Tokio timers have millisecond
/// resolution.
pub const MAX_REFILLS_PER_SEC: usize = 1000;

/// Shared token bucket. Must be created inside a Tokio runtime.
#[derive(Debug)]
pub struct RateLimiter {
    tokens: Arc<Semaphore>,
    capacity: usize,
    refill: JoinHandle<()>,
}

impl RateLimiter {
    /// Create a limiter admitting `requests_per_second` requests per second.
    ///
    /// A rate of zero is treated as one request per second.
    pub fn new(requests_per_second: u32) -> Self {
        let capacity = requests_per_second.max(1) as usize;
        let (period, batch) = refill_schedule(capacity);
        let tokens = Arc::new(Semaphore::new(capacity));
        let refill = tokio::spawn(refill(Arc::clone(&tokens), capacity, period, batch));
        debug!(capacity, ?period, batch, "Rate limiter started");
        Self {
            tokens,
            capacity,
            refill,
        }
    }

    /// Block until a token is available or `cancel` fires.
    ///
    /// On cancellation this returns [`ScrapeError::Cancelled`] without
    /// consuming a token. An already-cancelled token is reported even if
    /// the bucket has tokens to spare.
    #[instrument(level = "trace", skip_all)]
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<(), ScrapeError> {
        if cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScrapeError::Cancelled),
            permit = self.tokens.acquire() => match permit {
                Ok(permit) => {
                    // The token is spent; only the refill task gives it back.
                    permit.forget();
                    Ok(())
                }
                Err(_) => Err(ScrapeError::Cancelled),
            },
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(test)]
    fn available(&self) -> usize {
        self.tokens.available_permits()
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.refill.abort();
    }
}

/// Tick period and tokens per tick for a bucket of `capacity` tokens per
/// second. The period is never shorter than `1s / MAX_REFILLS_PER_SEC`.
fn refill_schedule(capacity: usize) -> (Duration, usize) {
    let batch = capacity.div_ceil(MAX_REFILLS_PER_SEC);
    let period = Duration::from_secs(1) * batch as u32 / capacity as u32;
    (period, batch)
}

async fn refill(tokens: Arc<Semaphore>, capacity: usize, period: Duration, batch: usize) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let missing = capacity.saturating_sub(tokens.available_permits());
        if missing > 0 {
            tokens.add_permits(missing.min(batch));
        }
    }
}
