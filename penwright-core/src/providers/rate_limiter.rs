//! Client-side sliding-window rate limiter for outbound requests.
//!
//! Proactively throttles requests to stay within a requests-per-minute budget
//! instead of relying on 429 backpressure from the model or search provider.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// A sliding-window limiter over request timestamps.
#[derive(Debug)]
pub struct RequestRateLimiter {
    /// Requests allowed per window (0 = unlimited).
    rpm: usize,
    /// Timestamps of recent requests within the window.
    requests_window: VecDeque<Instant>,
    /// Sliding window duration (1 minute).
    window: Duration,
}

impl RequestRateLimiter {
    /// Create a new limiter allowing `rpm` requests per minute.
    pub fn new(rpm: usize) -> Self {
        Self::with_window(rpm, Duration::from_secs(60))
    }

    /// Create a limiter with a custom window length.
    pub fn with_window(rpm: usize, window: Duration) -> Self {
        Self {
            rpm,
            requests_window: VecDeque::new(),
            window,
        }
    }

    /// Check if a request can proceed at `now`.
    ///
    /// Returns `None` if the request can proceed immediately, or `Some(delay)`
    /// indicating how long to wait before checking again.
    pub fn check_at(&mut self, now: Instant) -> Option<Duration> {
        if self.rpm == 0 {
            return None;
        }
        self.prune(now);

        if self.requests_window.len() >= self.rpm
            && let Some(&oldest) = self.requests_window.front()
        {
            let wait = self.window.saturating_sub(now.duration_since(oldest));
            if !wait.is_zero() {
                return Some(wait);
            }
        }
        None
    }

    /// Check against the current time.
    pub fn check(&mut self) -> Option<Duration> {
        self.check_at(Instant::now())
    }

    /// Record a request issued at `now`.
    pub fn record_at(&mut self, now: Instant) {
        if self.rpm > 0 {
            self.requests_window.push_back(now);
        }
    }

    /// Record a request issued now.
    pub fn record(&mut self) {
        self.record_at(Instant::now());
    }

    /// Check if a limit is configured.
    pub fn has_limits(&self) -> bool {
        self.rpm > 0
    }

    /// Requests counted in the current window.
    pub fn current_usage(&mut self) -> usize {
        self.prune(Instant::now());
        self.requests_window.len()
    }

    /// Remove entries older than the sliding window.
    fn prune(&mut self, now: Instant) {
        while self
            .requests_window
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            self.requests_window.pop_front();
        }
    }
}
