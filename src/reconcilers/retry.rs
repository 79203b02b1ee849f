// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Jittered exponential backoff for Kubernetes and webhook calls.
//!
//! Transient failures (429, 5xx, connection errors) are retried until the
//! policy's elapsed budget is spent. Anything else fails on the first attempt.

use anyhow::Result;
use rand::Rng;
use reqwest::StatusCode;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Shape of a retry schedule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_elapsed_time: Duration,
    pub multiplier: f64,
    /// Fraction of each interval used as symmetric jitter.
    pub jitter: f64,
}

impl RetryPolicy {
    /// Kubernetes API reads and lists: 100ms doubling to 30s, 2 minutes total.
    pub const KUBE_API: Self = Self {
        initial_interval: Duration::from_millis(100),
        max_interval: Duration::from_secs(30),
        max_elapsed_time: Duration::from_secs(120),
        multiplier: 2.0,
        jitter: 0.1,
    };

    /// Webhook provider reads: 50ms doubling to 10s, 1 minute total.
    pub const WEBHOOK: Self = Self {
        initial_interval: Duration::from_millis(50),
        max_interval: Duration::from_secs(10),
        max_elapsed_time: Duration::from_secs(60),
        multiplier: 2.0,
        jitter: 0.1,
    };

    /// Start a fresh schedule; the elapsed budget counts from now.
    #[must_use]
    pub fn start(self) -> Backoff {
        Backoff {
            policy: self,
            next: self.initial_interval,
            started: Instant::now(),
        }
    }
}

/// Delays of one retry schedule. Ends once the elapsed budget is spent.
#[derive(Debug)]
pub struct Backoff {
    policy: RetryPolicy,
    next: Duration,
    started: Instant,
}

impl Backoff {
    /// Un-jittered interval the next call will be based on.
    #[must_use]
    pub fn current_interval(&self) -> Duration {
        self.next
    }

    fn jittered(&self, interval: Duration) -> Duration {
        if self.policy.jitter <= 0.0 {
            return interval;
        }
        let secs = interval.as_secs_f64();
        let delta = secs * self.policy.jitter;
        Duration::from_secs_f64(rand::rng().random_range((secs - delta)..=(secs + delta)).max(0.0))
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.started.elapsed() >= self.policy.max_elapsed_time {
            return None;
        }
        let interval = self.next;
        self.next = interval.mul_f64(self.policy.multiplier).min(self.policy.max_interval);
        Some(self.jittered(interval))
    }
}

/// Whether an HTTP status indicates a transient failure (429, 500, 502, 503, 504).
#[must_use]
pub fn is_retryable_http_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Whether an API status code is transient: 429 or 5xx.
#[must_use]
pub fn is_retryable_status_code(code: u16) -> bool {
    code == 429 || (500..600).contains(&code)
}

fn is_retryable_kube_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(api_err) => is_retryable_status_code(api_err.code),
        kube::Error::Service(_) => true,
        _ => false,
    }
}

/// Run a Kubernetes API call under [`RetryPolicy::KUBE_API`].
///
/// # Errors
///
/// Returns the first non-retryable error, or the last error once the
/// schedule is exhausted.
pub async fn retry_api_call<T, F, Fut>(mut operation: F, operation_name: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
{
    let mut backoff = RetryPolicy::KUBE_API.start();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, "Kubernetes API call succeeded after retries");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !is_retryable_kube_error(&err) {
            debug!(operation = operation_name, error = %err, "Non-retryable Kubernetes API error");
            return Err(err.into());
        }

        let Some(delay) = backoff.next() else {
            error!(operation = operation_name, attempt, error = %err, "Retries exhausted");
            return Err(anyhow::anyhow!("{operation_name} failed after {attempt} attempts: {err}"));
        };
        warn!(
            operation = operation_name,
            attempt,
            retry_after = ?delay,
            error = %err,
            "Retryable Kubernetes API error, will retry"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
