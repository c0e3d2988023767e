use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: u64,
}

impl RetryConfig {
    /// Un-jittered backoff before attempt `attempt + 1`, capped at `max_delay_ms`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let mut delay_ms = self.initial_delay_ms;
        for _ in 1..attempt {
            delay_ms = delay_ms.saturating_mul(self.backoff_multiplier);
            if delay_ms >= self.max_delay_ms {
                break;
            }
        }
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 200,
            max_delay_ms: 10_000,
            backoff_multiplier: 2,
        }
    }
}
