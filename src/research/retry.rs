use crate::types::{AppError, Result};
use crate::utils::toml_config::RetryConfig;
use std::future::Future;
use std::time::Duration;

/// How many times an external call is attempted before its failure is
/// final. The default is a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    pub fn attempts(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Run `op` until it succeeds, fails with a non-upstream error, or the
    /// attempts are used up. Backoff grows linearly with the attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err @ AppError::Upstream(_)) if attempt < self.max_attempts => {
                    tracing::warn!(
                        call = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "external call failed, retrying"
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
