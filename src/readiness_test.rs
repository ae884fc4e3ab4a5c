//! Tests for the readiness poller
//!
//! Time is paused so that 15 second delays complete instantly while the
//! virtual clock still records exactly how long the poller slept.

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::time::Instant;

/// Health check that fails until a given attempt number
struct FlakyCheck {
    succeed_on: Option<u32>,
    calls: AtomicU32,
}

impl FlakyCheck {
    fn succeeding_on(attempt: u32) -> Self {
        Self {
            succeed_on: Some(attempt),
            calls: AtomicU32::new(0),
        }
    }

    fn never() -> Self {
        Self {
            succeed_on: None,
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthCheck for FlakyCheck {
    fn target(&self) -> &str {
        "test-cluster"
    }

    async fn check(&self) -> Result<(), String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.succeed_on {
            Some(n) if call >= n => Ok(()),
            _ => Err(format!("connection refused (call {})", call)),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_ready_on_first_check_does_not_sleep() {
    // ARRANGE
    let check = FlakyCheck::succeeding_on(1);
    let budget = RetryBudget::new(10, Duration::from_secs(15));
    let start = Instant::now();

    // ACT
    let outcome = await_ready(&check, &budget).await;

    // ASSERT
    assert_eq!(outcome, Readiness::Ready { attempts: 1 });
    assert_eq!(check.calls(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_ready_on_attempt_k_sleeps_k_minus_one_times() {
    for k in 1..=10u32 {
        let check = FlakyCheck::succeeding_on(k);
        let budget = RetryBudget::new(10, Duration::from_secs(15));
        let start = Instant::now();

        let outcome = await_ready(&check, &budget).await;

        assert_eq!(outcome, Readiness::Ready { attempts: k });
        assert_eq!(check.calls(), k, "exactly k checks for k={}", k);
        assert_eq!(
            start.elapsed(),
            Duration::from_secs(15 * u64::from(k - 1)),
            "exactly k-1 delays for k={}",
            k
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_times_out_after_exactly_max_attempts() {
    // ARRANGE: 10 attempts at 15s spacing, never ready
    let check = FlakyCheck::never();
    let budget = RetryBudget::default();
    let start = Instant::now();

    // ACT
    let outcome = await_ready(&check, &budget).await;

    // ASSERT
    assert!(!outcome.is_ready());
    assert_eq!(outcome.attempts(), 10);
    assert_eq!(check.calls(), 10);
    // 9 sleeps between 10 checks, none after the last one
    assert_eq!(start.elapsed(), Duration::from_secs(135));
    match outcome {
        Readiness::TimedOut { last_error, .. } => {
            assert!(last_error.contains("call 10"));
        }
        other => panic!("expected TimedOut, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_success_after_budget_is_never_observed() {
    let check = FlakyCheck::succeeding_on(4);
    let budget = RetryBudget::new(3, Duration::from_secs(1));

    let outcome = await_ready(&check, &budget).await;

    assert!(matches!(outcome, Readiness::TimedOut { attempts: 3, .. }));
    assert_eq!(check.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_exponential_backoff_total_delay() {
    let check = FlakyCheck::never();
    let budget = RetryBudget::new(4, Duration::from_secs(1)).with_backoff(Backoff::Exponential {
        factor: 2.0,
        max_delay: Duration::from_secs(3),
    });
    let start = Instant::now();

    await_ready(&check, &budget).await;

    // 1s + 2s + 3s (capped)
    assert_eq!(start.elapsed(), Duration::from_secs(6));
}

#[test]
fn test_budget_clamps_zero_attempts() {
    let budget = RetryBudget::new(0, Duration::from_secs(1));
    assert_eq!(budget.max_attempts(), 1);
}

#[test]
fn test_first_attempt_has_no_delay() {
    let budget = RetryBudget::default();
    assert_eq!(budget.delay_before(1), Duration::ZERO);
    assert_eq!(budget.delay_before(2), Duration::from_secs(15));
}

#[test]
fn test_exponential_delay_caps_for_huge_attempt_numbers() {
    let budget = RetryBudget::new(u32::MAX, Duration::from_secs(1)).with_backoff(
        Backoff::Exponential {
            factor: 2.0,
            max_delay: Duration::from_secs(300),
        },
    );

    // Exponent past i32::MAX must saturate, not wrap negative
    assert_eq!(budget.delay_before(u32::MAX), Duration::from_secs(300));
    assert_eq!(
        budget.delay_before(i32::MAX as u32 + 3),
        Duration::from_secs(300)
    );
}
