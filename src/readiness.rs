//! Readiness polling
//!
//! Polls a cheap, idempotent health query until it succeeds or the retry
//! budget runs out. Only this read is ever retried; provisioning steps are not.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How the delay between attempts evolves
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed,
    /// Delay multiplied by `factor` after each retry, capped at `max_delay`
    Exponential { factor: f64, max_delay: Duration },
}

/// Attempt limit and delay policy for the readiness poller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryBudget {
    max_attempts: u32,
    delay: Duration,
    backoff: Backoff,
}

impl RetryBudget {
    /// Fixed-delay budget; `max_attempts` is clamped to at least one check
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff: Backoff::Fixed,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait before `attempt` (1-based). The first attempt never waits.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { factor, max_delay } => {
                let exponent = i32::try_from(attempt - 2).unwrap_or(i32::MAX);
                let secs = self.delay.as_secs_f64() * factor.powi(exponent);
                if !secs.is_finite() || secs >= max_delay.as_secs_f64() {
                    max_delay
                } else {
                    Duration::from_secs_f64(secs)
                }
            }
        }
    }
}

impl Default for RetryBudget {
    /// 10 attempts, 15 seconds apart
    fn default() -> Self {
        Self::new(10, Duration::from_secs(15))
    }
}

/// A single health query against a cluster
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Name of the thing being checked, for logging
    fn target(&self) -> &str;

    /// Run one check. `Err` carries a human-readable reason.
    async fn check(&self) -> Result<(), String>;
}

/// Terminal outcome of polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready { attempts: u32 },
    TimedOut { attempts: u32, last_error: String },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Readiness::Ready { attempts } | Readiness::TimedOut { attempts, .. } => *attempts,
        }
    }
}

/// Poll `check` until it succeeds or `budget` is exhausted
///
/// Success on attempt k means exactly k checks and k-1 sleeps. Exhaustion
/// means exactly `max_attempts` checks; no sleep follows the final check.
pub async fn await_ready<H>(check: &H, budget: &RetryBudget) -> Readiness
where
    H: HealthCheck + ?Sized,
{
    let mut last_error = String::new();

    for attempt in 1..=budget.max_attempts() {
        let delay = budget.delay_before(attempt);
        if !delay.is_zero() {
            debug!(
                target_cluster = check.target(),
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "Waiting before next readiness check"
            );
            tokio::time::sleep(delay).await;
        }

        match check.check().await {
            Ok(()) => {
                info!(
                    target_cluster = check.target(),
                    attempt = attempt,
                    "Cluster is ready"
                );
                return Readiness::Ready { attempts: attempt };
            }
            Err(e) => {
                warn!(
                    target_cluster = check.target(),
                    attempt = attempt,
                    max_attempts = budget.max_attempts(),
                    error = %e,
                    "Cluster not ready yet"
                );
                last_error = e;
            }
        }
    }

    Readiness::TimedOut {
        attempts: budget.max_attempts(),
        last_error,
    }
}

#[cfg(test)]
#[path = "readiness_test.rs"]
mod tests;
