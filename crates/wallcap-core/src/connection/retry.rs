//! Bounded connect-retry loop.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::ConnectionConfig;
use crate::error::CaptureError;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up; the attempt budget is spent.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Fixed-interval policy with a hard attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Pause between attempts.
    pub retry_interval: Duration,
    /// Longest a single attempt may take before it counts as failed.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_interval: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&ConnectionConfig> for RetryPolicy {
    fn from(cfg: &ConnectionConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            retry_interval: Duration::from_millis(cfg.retry_interval_ms),
            attempt_timeout: Duration::from_millis(cfg.attempt_timeout_ms.max(1)),
        }
    }
}

impl RetryPolicy {
    /// `failures` is the number of consecutive failed attempts so far.
    pub fn decide(&self, failures: u32) -> RetryDecision {
        if failures >= self.max_attempts.max(1) {
            RetryDecision::NoRetry
        } else {
            RetryDecision::RetryAfter(self.retry_interval)
        }
    }
}

/// Runs `attempt` until it succeeds or the policy gives up, sleeping
/// `retry_interval` between attempts. `attempt` receives the 0-based attempt
/// number. An attempt still pending after `attempt_timeout` is dropped and
/// counts as a failure. Exhaustion yields [`CaptureError::Connection`]
/// carrying the last error.
pub async fn connect_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    endpoint: &str,
    mut attempt: F,
) -> Result<T, CaptureError>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempts = 0u32;
    loop {
        let outcome = match tokio::time::timeout(policy.attempt_timeout, attempt(attempts)).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("attempt timed out after {:?}", policy.attempt_timeout)),
        };
        match outcome {
            Ok(value) => {
                if attempts > 0 {
                    tracing::info!(endpoint, attempts = attempts + 1, "connected after retrying");
                }
                return Ok(value);
            }
            Err(e) => {
                attempts += 1;
                tracing::warn!(
                    endpoint,
                    attempt = attempts,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "connection attempt failed"
                );
                match policy.decide(attempts) {
                    RetryDecision::NoRetry => {
                        return Err(CaptureError::Connection {
                            endpoint: endpoint.to_string(),
                            attempts,
                            last_error: e,
                        })
                    }
                    RetryDecision::RetryAfter(d) => tokio::time::sleep(d).await,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_interval_until_cap() {
        let p = RetryPolicy {
            max_attempts: 3,
            retry_interval: Duration::from_millis(5),
            ..Default::default()
        };
        assert_eq!(p.decide(1), RetryDecision::RetryAfter(Duration::from_millis(5)));
        assert_eq!(p.decide(2), RetryDecision::RetryAfter(Duration::from_millis(5)));
        assert_eq!(p.decide(3), RetryDecision::NoRetry);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let p = RetryPolicy {
            max_attempts: 0,
            retry_interval: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(p.decide(1), RetryDecision::NoRetry);
    }

    #[test]
    fn policy_from_config() {
        let p = RetryPolicy::from(&ConnectionConfig {
            max_attempts: 4,
            retry_interval_ms: 1500,
            attempt_timeout_ms: 2500,
        });
        assert_eq!(p.max_attempts, 4);
        assert_eq!(p.retry_interval, Duration::from_millis(1500));
        assert_eq!(p.attempt_timeout, Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn attempt_numbers_start_at_zero() {
        let p = RetryPolicy {
            max_attempts: 5,
            retry_interval: Duration::ZERO,
            ..Default::default()
        };
        let mut seen = Vec::new();
        let out = connect_with_retry(&p, "ws://test", |n| {
            seen.push(n);
            async move {
                if n < 2 {
                    Err("refused")
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 2);
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn hung_attempt_counts_as_failure() {
        let p = RetryPolicy {
            max_attempts: 2,
            retry_interval: Duration::ZERO,
            attempt_timeout: Duration::from_millis(20),
        };
        let err = connect_with_retry(&p, "ws://test", |_| {
            futures::future::pending::<Result<(), &str>>()
        })
        .await
        .unwrap_err();
        match err {
            CaptureError::Connection { attempts, last_error, .. } => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("timed out"));
            }
            other => panic!("expected connection error, got {other}"),
        }
    }
}
