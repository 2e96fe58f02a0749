//! Bounded retry executor with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::{classify, Fault};
use crate::monitoring::{Level, ReportContext, Reporter};

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never below 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each one after.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Single attempt, first failure is terminal.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(500))
    }
}

/// Run `op`, retrying retryable failures until the policy is exhausted.
///
/// The fault returned on failure is always the one raised by the last
/// attempt, never a synthetic "retries exhausted" error. Every retry is
/// reported to `reporter` as a warning message starting with `"retrying"`.
pub async fn run_with_retry<T, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    reporter: &dyn Reporter,
    mut op: F,
) -> Result<T, Fault>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Fault>>,
{
    let mut attempt = 1;
    loop {
        let fault = match op().await {
            Ok(value) => return Ok(value),
            Err(fault) => fault,
        };

        let classified = classify(&fault);
        if !classified.retryable || attempt >= policy.max_attempts {
            return Err(fault);
        }

        let delay = policy.delay_for(attempt);
        warn!(
            operation,
            attempt,
            max_attempts = policy.max_attempts,
            kind = %classified.kind,
            delay_ms = delay.as_millis() as u64,
            "Retrying after failure: {}",
            fault
        );
        reporter.report_message(
            &format!("retrying {}", operation),
            Level::Warning,
            &ReportContext::new(operation)
                .with_kind(classified.kind)
                .tag("attempt", attempt)
                .tag("max_attempts", policy.max_attempts)
                .tag("delay_ms", delay.as_millis()),
        );

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
