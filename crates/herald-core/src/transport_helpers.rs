//! Retry and backoff helpers shared by the tracker and chat HTTP clients.

use std::time::Duration;

use anyhow::{Context, Result};

pub const RETRY_ATTEMPT_HEADER: &str = "x-herald-retry-attempt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms: base_delay_ms.max(1),
        }
    }
}

pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

pub fn retry_delay(
    base_delay_ms: u64,
    attempt: usize,
    retry_after_seconds: Option<u64>,
) -> Duration {
    if let Some(retry_after_seconds) = retry_after_seconds {
        return Duration::from_secs(retry_after_seconds);
    }
    let exponent = attempt.saturating_sub(1).min(6) as u32;
    let scale = 2_u64.pow(exponent);
    Duration::from_millis(base_delay_ms.max(1).saturating_mul(scale))
}

pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

pub fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

/// Sends the request built by `builder`, retrying rate limits, server errors
/// and transient transport failures. Returns the last response, whatever its
/// status, once retries are exhausted or the status is final.
pub async fn send_with_retry<F>(
    operation: &str,
    policy: RetryPolicy,
    mut builder: F,
) -> Result<reqwest::Response>
where
    F: FnMut() -> reqwest::RequestBuilder,
{
    let mut attempt = 0_usize;
    loop {
        attempt = attempt.saturating_add(1);
        let response = builder()
            .header(RETRY_ATTEMPT_HEADER, attempt.saturating_sub(1).to_string())
            .send()
            .await;
        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                if attempt < policy.max_attempts && is_retryable_status(status) {
                    let delay = retry_delay(
                        policy.base_delay_ms,
                        attempt,
                        parse_retry_after(response.headers()),
                    );
                    tracing::debug!(operation, status, attempt, ?delay, "retrying request");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Ok(response);
            }
            Err(error) => {
                if attempt < policy.max_attempts && is_retryable_transport_error(&error) {
                    let delay = retry_delay(policy.base_delay_ms, attempt, None);
                    tracing::debug!(operation, attempt, ?delay, %error, "retrying request");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(error).with_context(|| format!("{operation} request failed"));
            }
        }
    }
}
