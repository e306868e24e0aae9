//! Fixed-window request limiter

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Length of one accounting window
pub const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Window {
    started: Instant,
    used: u32,
}

/// Admits at most `limit` requests per [`WINDOW`]
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Mutex<Window>,
    total: Mutex<u64>,
}

impl RateLimiter {
    /// Create new limiter
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            window: Mutex::new(Window {
                started: Instant::now(),
                used: 0,
            }),
            total: Mutex::new(0),
        }
    }

    /// Record a request; `false` when the current window is exhausted
    pub fn try_acquire(&self) -> bool {
        *self.total.lock() += 1;
        let mut window = self.window.lock();
        if window.started.elapsed() >= WINDOW {
            window.started = Instant::now();
            window.used = 0;
        }
        if window.used >= self.limit {
            return false;
        }
        window.used += 1;
        true
    }

    /// Seconds until the current window resets
    #[must_use]
    pub fn retry_after_secs(&self) -> u64 {
        let window = self.window.lock();
        WINDOW.saturating_sub(window.started.elapsed()).as_secs().max(1)
    }

    /// Requests seen since creation, admitted or not
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        *self.total.lock()
    }

    /// Configured per-window limit
    #[inline]
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_enforced() {
        let limiter = RateLimiter::new(2);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        assert_eq!(limiter.total_requests(), 3);
        assert!(limiter.retry_after_secs() >= 1);
    }

    #[test]
    fn zero_limit_rejects_everything() {
        let limiter = RateLimiter::new(0);
        assert!(!limiter.try_acquire());
    }
}
