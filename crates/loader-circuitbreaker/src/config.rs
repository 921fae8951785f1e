use std::time::Duration;

/// Tunables for one provider's breaker. Defaults match §4.4.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub error_threshold: f64,
    pub recovery_timeout: Duration,
    pub min_requests: usize,
    pub half_open_max_requests: usize,
    pub window_size: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            error_threshold: 0.20,
            recovery_timeout: Duration::from_secs(60),
            min_requests: 10,
            half_open_max_requests: 3,
            window_size: 100,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: Option<CircuitBreakerConfig>,
}

impl CircuitBreakerConfigBuilder {
    fn cfg(&mut self) -> &mut CircuitBreakerConfig {
        self.config.get_or_insert_with(CircuitBreakerConfig::default)
    }

    pub fn error_threshold(mut self, v: f64) -> Self {
        self.cfg().error_threshold = v;
        self
    }

    pub fn recovery_timeout(mut self, v: Duration) -> Self {
        self.cfg().recovery_timeout = v;
        self
    }

    pub fn min_requests(mut self, v: usize) -> Self {
        self.cfg().min_requests = v;
        self
    }

    pub fn half_open_max_requests(mut self, v: usize) -> Self {
        self.cfg().half_open_max_requests = v;
        self
    }

    pub fn window_size(mut self, v: usize) -> Self {
        self.cfg().window_size = v;
        self
    }

    pub fn build(mut self) -> CircuitBreakerConfig {
        self.cfg();
        self.config.unwrap()
    }
}
