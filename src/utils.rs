use std::future::Future;

use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

use crate::models::{retry::RetryConfig, stage::DelayRange};

/// Runs `operation` until it succeeds or `max_attempts` is reached,
/// sleeping an exponentially growing, ±10% jittered delay in between.
pub async fn retry_with_backoff<F, Fut, T, E>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    info!(attempt, max_attempts = config.max_attempts, "Retry succeeded");
                }
                return Ok(result);
            }
            Err(e) => {
                if attempt >= config.max_attempts {
                    warn!(
                        max_attempts = config.max_attempts,
                        error = %e,
                        "Retry failed after exhausting all attempts"
                    );
                    return Err(e);
                }

                let delay = jittered(config.delay_for_attempt(attempt));

                debug!(
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retry attempt failed, backing off"
                );

                sleep(delay).await;
            }
        }
    }
}

pub fn jittered(delay: Duration) -> Duration {
    let jitter = rand::random_range(-0.1..=0.1);
    delay.mul_f64(1.0 + jitter)
}

/// Sleeps for a sample of `delay`; a zero range returns immediately.
pub async fn simulate_processing(delay: DelayRange) {
    if delay.is_zero() {
        return;
    }

    let duration = delay.sample();
    debug!(delay_ms = duration.as_millis() as u64, "Simulating processing delay");
    sleep(duration).await;
}
