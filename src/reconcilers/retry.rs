// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic with exponential backoff for DNS provider calls.
//!
//! Transient provider errors (429, 5xx, transport failures) are retried with
//! exponential backoff and jitter; permanent errors fail immediately.

use crate::dns_errors::ProviderError;
use crate::metrics;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Initial retry interval (200ms)
const INITIAL_INTERVAL_MILLIS: u64 = 200;

/// Maximum interval between retries (10 seconds)
const MAX_INTERVAL_SECS: u64 = 10;

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Exponential backoff bounded by a number of attempts.
pub struct ExponentialBackoff {
    /// Current interval duration
    pub current_interval: Duration,
    /// Initial interval duration
    pub initial_interval: Duration,
    /// Maximum interval duration
    pub max_interval: Duration,
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Backoff multiplier (typically 2.0 for doubling)
    pub multiplier: f64,
    /// Randomization factor (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
    attempts: u32,
}

impl ExponentialBackoff {
    #[must_use]
    pub fn new(
        initial_interval: Duration,
        max_interval: Duration,
        max_attempts: u32,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            initial_interval,
            max_interval,
            max_attempts: max_attempts.max(1),
            multiplier,
            randomization_factor,
            attempts: 1,
        }
    }

    /// Attempts started so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Get the delay before the next attempt, or None once attempts are used up.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;

        let interval = self.current_interval;
        let jittered = self.apply_jitter(interval);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        Some(jittered)
    }

    /// Apply randomization (jitter) to an interval.
    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;

        let mut rng = rand::thread_rng();
        let jittered = rng.gen_range((secs - delta)..=(secs + delta));

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Backoff used for provider calls and apply attempts.
///
/// # Retry Schedule
///
/// With `max_attempts = 5`, retries occur after approximately:
///
/// 1. 200ms
/// 2. 400ms
/// 3. 800ms
/// 4. 1.6s
///
/// Intervals double until capped at 10 seconds.
#[must_use]
pub fn provider_backoff(max_attempts: u32) -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(MAX_INTERVAL_SECS),
        max_attempts,
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Retry a provider call with exponential backoff.
///
/// Retries while [`ProviderError::is_retryable`] holds and attempts remain. Every
/// failure is counted in the provider error metric under `operation_name`.
///
/// # Errors
///
/// Returns the first non-retryable error, or the last error once attempts are
/// exhausted.
pub async fn retry_provider_call<T, F, Fut>(
    mut operation: F,
    operation_name: &str,
    max_attempts: u32,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut backoff = provider_backoff(max_attempts);
    let start_time = Instant::now();

    loop {
        match operation().await {
            Ok(value) => {
                if backoff.attempts() > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = backoff.attempts(),
                        elapsed = ?start_time.elapsed(),
                        "Provider call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) => {
                metrics::record_provider_error(operation_name, e.error_type());

                if !e.is_retryable() {
                    error!(
                        operation = operation_name,
                        error = %e,
                        "Non-retryable provider error, failing immediately"
                    );
                    return Err(e);
                }

                let attempt = backoff.attempts();
                match backoff.next_backoff() {
                    Some(duration) => {
                        warn!(
                            operation = operation_name,
                            attempt,
                            retry_after = ?duration,
                            error = %e,
                            "Retryable provider error, will retry"
                        );
                        tokio::time::sleep(duration).await;
                    }
                    None => {
                        error!(
                            operation = operation_name,
                            attempt,
                            elapsed = ?start_time.elapsed(),
                            error = %e,
                            "Retry attempts exhausted, giving up"
                        );
                        return Err(e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
