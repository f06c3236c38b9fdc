//! Per-phase token-bucket rate limiting.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tokio::time::sleep;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket rate limiter: `requests_per_second` refill rate, `burst`
/// maximum tokens. Shared across every concurrent prober in a phase.
pub struct RateLimiter {
    requests_per_second: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Build a limiter with the given steady-state rate and burst capacity.
    #[must_use]
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            requests_per_second: requests_per_second.max(0.0),
            burst,
            bucket: Mutex::new(Bucket { tokens: burst, last_refill: Instant::now() }),
        }
    }

    /// A limiter with no effective limit, for tests and phases that opt out
    /// of throttling.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(f64::MAX, u32::MAX)
    }

    fn try_take(&self) -> Option<Duration> {
        let mut bucket = self.bucket.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.requests_per_second).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            None
        } else {
            let deficit = 1.0 - bucket.tokens;
            Some(Duration::from_secs_f64(deficit / self.requests_per_second.max(f64::MIN_POSITIVE)))
        }
    }

    /// Acquire one token, sleeping as needed. A suspension point the
    /// concurrency model lists explicitly.
    pub async fn acquire(&self) {
        loop {
            match self.try_take() {
                None => return,
                Some(wait) => sleep(wait).await,
            }
        }
    }
}
