use crate::config::RetryConfig;
use std::time::Duration;

const MIN_DELAY_SECS: f64 = 0.1;

/// `delay(attempt) = min(maxDelay, baseDelay * exponentialBase^attempt)`,
/// then optionally jittered by `uniform[1 - jitterFactor, 1 + jitterFactor]`
/// and clamped to a 100ms floor. `attempt` is 0-based (the first retry).
pub fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let base = config.base_delay.as_secs_f64() * config.exponential_base.powi(attempt as i32);
    let capped = base.min(config.max_delay.as_secs_f64());

    let delay = if config.jitter {
        let jitter_range = capped * config.jitter_factor;
        let jittered = capped + rand::random::<f64>() * 2.0 * jitter_range - jitter_range;
        jittered.max(MIN_DELAY_SECS)
    } else {
        capped
    };

    Duration::from_secs_f64(delay)
}
