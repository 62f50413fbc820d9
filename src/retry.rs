//! Outbound HTTP with bounded retries and exponential backoff.
//!
//! A response whose status is in [`RetryPolicy::retry_statuses`], a failed or
//! dropped connection, or an attempt that outlives [`RetryPolicy::attempt_timeout`]
//! is retried up to [`RetryPolicy::max_retries`] times. Retry `n` (1-based)
//! waits `backoff_factor * 2^(n-1)` seconds first. Any other status is handed
//! back to the caller untouched.

use std::{error::Error as _, io, time::Duration};

use wreq::{Method, StatusCode};

#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: f64,
    pub retry_statuses: Vec<u16>,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_factor: 0.3,
            retry_statuses: vec![500, 502, 504],
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Sleep before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30);
        let millis = self.backoff_factor * 1000.0 * f64::from(1u32 << exponent);
        // Float-to-int casts saturate, so NaN and negatives land on zero.
        Duration::from_millis(millis.round() as u64)
    }

    pub fn retries_status(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status.as_u16())
    }
}

#[derive(Clone, Debug)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream unavailable after {attempts} attempt(s): {detail}")]
    Unavailable { attempts: u32, detail: String },

    #[error("upstream request failed: {0}")]
    Request(#[from] wreq::Error),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("invalid upstream response: {0}")]
    Decode(String),
}

enum AttemptError {
    Transient(String),
    Fatal(wreq::Error),
}

#[derive(Clone)]
pub struct RetryingClient {
    http: wreq::Client,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(http: wreq::Client, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }

    pub async fn send(
        &self,
        method: Method,
        url: &str,
        auth: Option<&BasicAuth>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let mut retries = 0u32;
        loop {
            let detail = match self.attempt(method.clone(), url, auth).await {
                Ok(resp) if !self.policy.retries_status(resp.status) => return Ok(resp),
                Ok(resp) => format!("HTTP {}", resp.status.as_u16()),
                Err(AttemptError::Transient(detail)) => detail,
                Err(AttemptError::Fatal(err)) => return Err(err.into()),
            };

            if retries >= self.policy.max_retries {
                tracing::error!(url, attempts = retries + 1, detail = %detail, "upstream retries exhausted");
                return Err(UpstreamError::Unavailable { attempts: retries + 1, detail });
            }

            retries += 1;
            let delay = self.policy.delay_for(retries);
            tracing::warn!(
                url,
                retry = retries,
                delay_ms = delay.as_millis() as u64,
                detail = %detail,
                "retrying upstream request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(
        &self,
        method: Method,
        url: &str,
        auth: Option<&BasicAuth>,
    ) -> Result<UpstreamResponse, AttemptError> {
        let mut req = self.http.request(method, url);
        if let Some(auth) = auth {
            req = req.basic_auth(&auth.username, Some(&auth.password));
        }

        let exchange = async {
            let resp = req.send().await?;
            let status = resp.status();
            let body = resp.bytes().await?.to_vec();
            Ok::<_, wreq::Error>(UpstreamResponse { status, body })
        };

        match tokio::time::timeout(self.policy.attempt_timeout, exchange).await {
            Err(_) => Err(AttemptError::Transient(format!(
                "timed out after {}ms",
                self.policy.attempt_timeout.as_millis()
            ))),
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(err)) if is_transient(&err) => Err(AttemptError::Transient(err.to_string())),
            Ok(Err(err)) => Err(AttemptError::Fatal(err)),
        }
    }
}

/// No usable response arrived and a fresh attempt may succeed: the connection
/// failed, timed out, or broke before the response was fully read.
fn is_transient(err: &wreq::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() || broken_io(err)
}

fn broken_io(err: &wreq::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_from_backoff_factor() {
        let policy = RetryPolicy { backoff_factor: 0.3, ..Default::default() };
        assert_eq!(policy.delay_for(1), Duration::from_millis(300));
        assert_eq!(policy.delay_for(2), Duration::from_millis(600));
        assert_eq!(policy.delay_for(3), Duration::from_millis(1200));
    }

    #[test]
    fn zero_factor_never_sleeps() {
        let policy = RetryPolicy { backoff_factor: 0.0, ..Default::default() };
        assert_eq!(policy.delay_for(1), Duration::ZERO);
        assert_eq!(policy.delay_for(10), Duration::ZERO);
    }

    #[test]
    fn only_listed_statuses_are_retried() {
        let policy = RetryPolicy::default();
        assert!(policy.retries_status(StatusCode::BAD_GATEWAY));
        assert!(policy.retries_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!policy.retries_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!policy.retries_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn unavailable_error_names_last_failure() {
        let err = UpstreamError::Unavailable { attempts: 6, detail: "HTTP 502".to_string() };
        assert_eq!(err.to_string(), "upstream unavailable after 6 attempt(s): HTTP 502");
    }
}
