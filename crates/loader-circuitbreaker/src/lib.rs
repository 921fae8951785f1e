//! Per-provider three-state circuit breaker (C4).

mod circuit;
mod config;
mod error;

pub use circuit::{Circuit, CircuitStats, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Owns one [`Circuit`] per provider, creating them lazily with a shared
/// default configuration. Cloning is cheap (`Arc` internally); breakers for
/// different providers never share locks, so one provider's churn cannot
/// block another's (§4.9 failure isolation).
#[derive(Clone)]
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: Arc<DashMap<String, Arc<Mutex<Circuit>>>>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: Arc::new(DashMap::new()),
        }
    }

    fn breaker_for(&self, provider: &str) -> Arc<Mutex<Circuit>> {
        self.breakers
            .entry(provider.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Circuit::new(self.config))))
            .value()
            .clone()
    }

    /// Returns `Ok(())` if the call may proceed, or a [`CircuitBreakerError`]
    /// carrying the current state if it's rejected.
    pub fn check(&self, provider: &str) -> Result<(), CircuitBreakerError> {
        let breaker = self.breaker_for(provider);
        let mut circuit = breaker.lock();
        if circuit.can_execute() {
            Ok(())
        } else {
            Err(CircuitBreakerError {
                provider: provider.to_string(),
                state: circuit.state(),
            })
        }
    }

    pub fn record_success(&self, provider: &str) {
        self.breaker_for(provider).lock().record_success();
    }

    pub fn record_failure(&self, provider: &str) {
        self.breaker_for(provider).lock().record_failure();
    }

    pub fn state(&self, provider: &str) -> CircuitState {
        self.breaker_for(provider).lock().state()
    }

    pub fn stats(&self, provider: &str) -> CircuitStats {
        self.breaker_for(provider).lock().stats()
    }

    pub fn reset(&self, provider: Option<&str>) {
        match provider {
            Some(p) => self.breaker_for(p).lock().reset(),
            None => {
                for entry in self.breakers.iter() {
                    entry.value().lock().reset();
                }
            }
        }
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
