use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Simulated processing latency, sampled uniformly from `min_ms..=max_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub fn between(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn fixed(ms: u64) -> Self {
        Self::between(ms, ms)
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.max_ms == 0
    }

    pub fn sample(&self) -> Duration {
        if self.min_ms >= self.max_ms {
            return Duration::from_millis(self.max_ms);
        }
        Duration::from_millis(rand::random_range(self.min_ms..=self.max_ms))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSettings {
    pub failure_probability: f64,
    pub delay: DelayRange,
}

impl StageSettings {
    pub fn new(failure_probability: f64, delay: DelayRange) -> Self {
        Self {
            failure_probability,
            delay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub intake: StageSettings,
    pub retry: StageSettings,
    pub validation: StageSettings,
}

impl PipelineSettings {
    /// Same probabilities as the defaults but without simulated latency.
    pub fn immediate() -> Self {
        let defaults = Self::default();
        Self {
            intake: StageSettings::new(defaults.intake.failure_probability, DelayRange::none()),
            retry: StageSettings::new(defaults.retry.failure_probability, DelayRange::none()),
            validation: StageSettings::new(
                defaults.validation.failure_probability,
                DelayRange::none(),
            ),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            intake: StageSettings::new(0.15, DelayRange::between(1000, 1500)),
            retry: StageSettings::new(0.2, DelayRange::fixed(3000)),
            validation: StageSettings::new(0.05, DelayRange::between(500, 1000)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueNames {
    pub intake: String,
    pub retry: String,
    pub validation: String,
    pub dead_letter: String,
    pub poison: Option<String>,
}

impl QueueNames {
    /// Every queue the pipeline publishes to or consumes from.
    pub fn all(&self) -> Vec<String> {
        let mut queues = vec![
            self.intake.clone(),
            self.retry.clone(),
            self.validation.clone(),
            self.dead_letter.clone(),
        ];
        if let Some(poison) = &self.poison {
            queues.push(poison.clone());
        }
        queues
    }
}

impl Default for QueueNames {
    fn default() -> Self {
        Self {
            intake: "notification.intake".to_string(),
            retry: "notification.retry".to_string(),
            validation: "notification.validation".to_string(),
            dead_letter: "notification.dlq".to_string(),
            poison: None,
        }
    }
}
