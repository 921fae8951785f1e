//! Exponential backoff retry driver (C5).

mod backoff;
mod config;
mod error;

pub use backoff::calculate_delay;
pub use config::{RetryConfig, RetryConfigBuilder};
pub use error::RetryExhaustedError;

use loader_core::TransportError;
use std::future::Future;
use std::time::Duration;

/// What an `execute` call returns on success, alongside how much retrying it
/// took to get there. `retries_performed` counts every attempt after the
/// first — including attempts that belong to a call that eventually
/// succeeded, not just calls that exhausted all retries.
#[derive(Debug, Clone)]
pub struct RetryOutcome<T> {
    pub value: T,
    pub attempts: u32,
    pub retries_performed: u32,
    pub total_delay: Duration,
}

#[derive(Clone)]
pub struct RetryDriver {
    config: RetryConfig,
}

impl RetryDriver {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Whether attempt `attempt` (0-based) having failed with `error`
    /// warrants another try. Checked in order: exhausted the attempt budget,
    /// then the non-retryable status-code allow-list, then the error kind's
    /// own default.
    pub fn should_retry(&self, error: &TransportError, attempt: u32) -> bool {
        if attempt >= self.config.max_retries {
            return false;
        }
        if let Some(status) = error.status_code() {
            if self.config.non_retryable_status_codes.contains(&status) {
                return false;
            }
        }
        error.kind().is_retryable_by_default()
    }

    /// Runs `op` up to `max_retries + 1` times, sleeping with jittered
    /// exponential backoff between attempts, until it succeeds or every
    /// attempt is exhausted.
    pub async fn execute<T, F, Fut>(
        &self,
        provider: &str,
        mut op: F,
    ) -> Result<RetryOutcome<T>, RetryExhaustedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut last_error: Option<TransportError> = None;
        let mut total_delay = Duration::ZERO;
        let mut retries_performed = 0u32;
        let mut attempts_made = 0u32;

        for attempt in 0..=self.config.max_retries {
            attempts_made += 1;
            match op().await {
                Ok(value) => {
                    return Ok(RetryOutcome {
                        value,
                        attempts: attempts_made,
                        retries_performed,
                        total_delay,
                    });
                }
                Err(err) => {
                    let retry = self.should_retry(&err, attempt);
                    tracing::warn!(
                        provider,
                        attempt,
                        will_retry = retry,
                        error = %err,
                        "provider request attempt failed"
                    );
                    last_error = Some(err);
                    if !retry {
                        break;
                    }
                    let delay = calculate_delay(&self.config, attempt);
                    total_delay += delay;
                    retries_performed += 1;
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(RetryExhaustedError {
            attempts: attempts_made,
            last_error: last_error.expect("loop runs at least once"),
        })
    }
}

impl Default for RetryDriver {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
