//! Per-provider token bucket (spec §4.2, §5). A call blocks on a permit up
//! to a deadline; on expiry it returns `RateLimited` rather than waiting
//! forever, matching the "blocks up to a deadline derived from the caller's
//! context" contract in spec §4.2.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::ProviderError;

struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }
}

/// A token bucket guarding calls to one upstream host. `rps` is both the
/// refill rate and the bucket capacity (burst up to one second's worth).
pub struct TokenBucket {
    inner: Mutex<Bucket>,
}

impl TokenBucket {
    pub fn new(rps: u32) -> Self {
        let rps = f64::from(rps.max(1));
        Self {
            inner: Mutex::new(Bucket {
                tokens: rps,
                capacity: rps,
                refill_per_sec: rps,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Acquire one permit, waiting up to `deadline` for tokens to refill.
    /// Polls on a short fixed interval rather than computing an exact
    /// wake-up time — simple, and good enough at these RPS magnitudes.
    pub async fn acquire(&self, deadline: Duration) -> Result<(), ProviderError> {
        let started = Instant::now();
        loop {
            {
                let mut bucket = self.inner.lock().unwrap();
                bucket.refill();
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return Ok(());
                }
            }
            if started.elapsed() >= deadline {
                return Err(ProviderError::RateLimited);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
