//! Request gate placed in front of every outbound call.
//!
//! Combines a semaphore (bounded concurrency), a sliding-window rate limiter
//! and a per-call timeout. A timed-out call is reported as an ordinary error
//! so the caller can drop the affected item.

use super::rate_limiter::RequestRateLimiter;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tracing::debug;

/// Why a gated call did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("call timed out after {after_secs}s")]
    TimedOut { after_secs: u64 },

    #[error("request gate is closed")]
    Closed,
}

/// Shared limiter for one external collaborator.
#[derive(Debug, Clone)]
pub struct RequestGate {
    name: &'static str,
    semaphore: Arc<Semaphore>,
    limiter: Arc<Mutex<RequestRateLimiter>>,
    timeout: Duration,
}

impl RequestGate {
    /// Create a gate allowing `max_concurrent` in-flight calls and `rpm`
    /// calls per minute (0 = unlimited), each bounded by `timeout`.
    pub fn new(name: &'static str, max_concurrent: usize, rpm: usize, timeout: Duration) -> Self {
        Self {
            name,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            limiter: Arc::new(Mutex::new(RequestRateLimiter::new(rpm))),
            timeout,
        }
    }

    /// A gate with generous limits, for tests and local providers.
    pub fn unbounded(name: &'static str) -> Self {
        Self::new(name, 64, 0, Duration::from_secs(300))
    }

    /// The configured per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `call` once a permit and rate budget are available.
    ///
    /// The timeout covers only the call itself, not time spent queueing.
    pub async fn run<F, T>(&self, call: F) -> Result<T, GateError>
    where
        F: Future<Output = T>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| GateError::Closed)?;

        loop {
            let wait = {
                let mut limiter = self.limiter.lock().await;
                match limiter.check() {
                    None => {
                        limiter.record();
                        None
                    }
                    Some(delay) => Some(delay),
                }
            };
            match wait {
                None => break,
                Some(delay) => {
                    debug!(
                        gate = self.name,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limit reached, waiting"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| GateError::TimedOut {
                after_secs: self.timeout.as_secs(),
            })
    }

    /// Number of permits currently available.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}
