//! Request rate limiting
//!
//! Spaces out part requests so a large batch of uploads stays under the
//! store's undocumented per-minute request ceiling.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Token-bucket style limiter with a fixed refill interval
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    burst: u32,
    state: Mutex<LimiterState>,
}

#[derive(Debug)]
struct LimiterState {
    /// Earliest instant at which the bucket is empty again
    next_free: Instant,
}

impl RateLimiter {
    /// Allow `per_second` requests per second, with `burst` requests
    /// permitted back to back before spacing kicks in.
    pub fn new(per_second: u32, burst: u32) -> Self {
        let per_second = per_second.max(1);
        Self {
            interval: Duration::from_secs(1) / per_second,
            burst: burst.max(1),
            state: Mutex::new(LimiterState {
                next_free: Instant::now(),
            }),
        }
    }

    /// Interval between requests once the burst is spent
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until a request may be sent
    pub async fn acquire(&self) {
        let ready_at = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            // Credit never accumulates past the burst size.
            let floor = now
                .checked_sub(self.interval * (self.burst - 1))
                .unwrap_or(now);
            let start = state.next_free.max(floor);
            state.next_free = start + self.interval;
            start.max(now)
        };

        sleep_until(ready_at).await;
    }
}
