use std::collections::HashSet;
use std::time::Duration;

/// Configuration for exponential backoff retry behavior (§4.5).
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
    pub jitter: bool,
    pub jitter_factor: f64,
    /// Status codes that never get retried, even if the error kind is
    /// otherwise retryable (e.g. a 404 is a client mistake, not a transient
    /// condition).
    pub non_retryable_status_codes: HashSet<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs_f64(1.0),
            max_delay: Duration::from_secs_f64(60.0),
            exponential_base: 2.0,
            jitter: true,
            jitter_factor: 0.5,
            non_retryable_status_codes: [400, 401, 403, 404].into_iter().collect(),
        }
    }
}

impl RetryConfig {
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct RetryConfigBuilder {
    config: Option<RetryConfig>,
}

impl RetryConfigBuilder {
    fn get(&mut self) -> &mut RetryConfig {
        self.config.get_or_insert_with(RetryConfig::default)
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.get().max_retries = max_retries;
        self
    }

    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.get().base_delay = base_delay;
        self
    }

    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.get().max_delay = max_delay;
        self
    }

    pub fn exponential_base(mut self, exponential_base: f64) -> Self {
        self.get().exponential_base = exponential_base;
        self
    }

    pub fn jitter(mut self, jitter: bool) -> Self {
        self.get().jitter = jitter;
        self
    }

    pub fn jitter_factor(mut self, jitter_factor: f64) -> Self {
        self.get().jitter_factor = jitter_factor;
        self
    }

    pub fn non_retryable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.get().non_retryable_status_codes = codes.into_iter().collect();
        self
    }

    pub fn build(mut self) -> RetryConfig {
        self.config.take().unwrap_or_default()
    }
}
