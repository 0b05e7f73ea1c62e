// Retry logic: linear backoff over a bounded attempt budget
use crate::domain::{ApiFailure, PendingRequest};
use std::time::Duration;
use tracing::warn;

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the given backoff
    Retry(Duration),
    /// Do not retry, surface the failure
    GiveUp,
}

/// Retry policy for outbound requests
///
/// Determines if a failed attempt should be repeated based on:
/// - The failure class (only 5xx and online network failures are retried)
/// - The current attempt number against the attempt budget
/// - A linear backoff: `delay = base_delay * attempt`
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Arguments
    /// * `base_delay` - Backoff unit (default: 1000ms)
    pub fn new(base_delay: Duration) -> Self {
        Self { base_delay }
    }

    /// Backoff slept after a failed `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Decide what to do after `request.attempt` failed with `failure`
    ///
    /// # Example
    /// ```text
    /// match policy.decide(&pending, &failure) {
    ///     RetryDecision::Retry(delay) => sleeper.sleep(delay).await,
    ///     RetryDecision::GiveUp => return Err(failure),
    /// }
    /// ```
    pub fn decide(&self, request: &PendingRequest, failure: &ApiFailure) -> RetryDecision {
        if !failure.is_retryable() {
            return RetryDecision::GiveUp;
        }

        if request.is_last_attempt() {
            warn!(
                correlation_id = %request.correlation_id,
                url = %request.url,
                attempts = request.attempt,
                status = failure.status,
                "Max retry attempts reached"
            );
            return RetryDecision::GiveUp;
        }

        let delay = self.backoff_for(request.attempt);
        warn!(
            correlation_id = %request.correlation_id,
            url = %request.url,
            attempt = request.attempt,
            max_retries = request.max_retries,
            status = failure.status,
            delay_ms = delay.as_millis() as u64,
            "Scheduling retry"
        );

        RetryDecision::Retry(delay)
    }
}
