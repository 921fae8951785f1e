use crate::circuit::CircuitState;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
#[error("circuit breaker open for provider '{provider}' (state: {state:?})")]
pub struct CircuitBreakerError {
    pub provider: String,
    pub state: CircuitState,
}
