//! Transport-level retry for provider HTTP calls
//!
//! Retries happen below the gateway: a gateway call either eventually
//! returns or fails once, and the session decides what to do next.

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use tracing::{debug, warn};

use super::LlmError;
use crate::config::RetryConfig;

/// Fallback wait when a 429 carries no retry-after header
const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 60;

/// Exponential backoff policy for transient HTTP failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub attempts: u32,
    pub initial_delay: Duration,
    pub exp_base: u32,
    pub max_delay: Duration,
    /// Status codes worth another attempt
    pub status_codes: Vec<u16>,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            attempts: config.attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            exp_base: config.exp_base.max(1),
            max_delay: Duration::from_millis(config.max_delay_ms),
            status_codes: config.status_codes.clone(),
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            attempts: 1,
            initial_delay: Duration::ZERO,
            exp_base: 1,
            max_delay: Duration::ZERO,
            status_codes: Vec::new(),
        }
    }

    /// Delay before the `retry`-th retry (1-based): initial * base^(retry-1), capped
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = u64::from(self.exp_base).saturating_pow(retry.saturating_sub(1));
        let millis = u64::try_from(self.initial_delay.as_millis())
            .unwrap_or(u64::MAX)
            .saturating_mul(factor);
        Duration::from_millis(millis).min(self.max_delay)
    }

    pub fn retries_status(&self, status: u16) -> bool {
        self.status_codes.contains(&status)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Classify a failed send or body read; `timeout` is the client's configured limit
pub fn transport_error(error: reqwest::Error, timeout: Duration) -> LlmError {
    if error.is_timeout() {
        LlmError::Timeout(timeout)
    } else {
        LlmError::Network(error)
    }
}

/// Send the request built by `build`, retrying per `policy`
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed by `send`.
/// `timeout` is the limit the client was built with, reported on timeouts.
pub async fn send_with_retry<F>(policy: &RetryPolicy, timeout: Duration, build: F) -> Result<Response, LlmError>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_error = None;

    for attempt in 1..=policy.attempts {
        let is_last = attempt == policy.attempts;

        let response = match build().send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(attempt, error = %e, "send_with_retry: transport error");
                last_error = Some(transport_error(e, timeout));
                if !is_last {
                    let delay = policy.delay_for(attempt);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, "send_with_retry: retrying after network error");
                    tokio::time::sleep(delay).await;
                }
                continue;
            }
        };

        let status = response.status().as_u16();
        if response.status().is_success() {
            debug!(attempt, status, "send_with_retry: success");
            return Ok(response);
        }

        let retry_after = parse_retry_after(&response);

        if policy.retries_status(status) && !is_last {
            let delay = retry_after
                .map(|d| d.min(policy.max_delay))
                .unwrap_or_else(|| policy.delay_for(attempt));
            warn!(
                attempt,
                status,
                delay_ms = delay.as_millis() as u64,
                "send_with_retry: retrying after transient error"
            );
            tokio::time::sleep(delay).await;
            continue;
        }

        if status == 429 {
            debug!("send_with_retry: rate limited (429)");
            return Err(LlmError::RateLimited {
                retry_after: retry_after.unwrap_or(Duration::from_secs(DEFAULT_RATE_LIMIT_WAIT_SECS)),
            });
        }

        debug!(status, "send_with_retry: API error");
        let message = response.text().await.unwrap_or_default();
        return Err(LlmError::ApiError { status, message });
    }

    Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
