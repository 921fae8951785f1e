use loader_core::TransportError;
use thiserror::Error;

/// Raised when every attempt permitted by a [`crate::RetryConfig`] has been
/// used up without a success.
#[derive(Debug, Error)]
#[error("retry exhausted after {attempts} attempt(s): {last_error}")]
pub struct RetryExhaustedError {
    pub attempts: u32,
    #[source]
    pub last_error: TransportError,
}
