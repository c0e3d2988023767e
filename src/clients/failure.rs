use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
};

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Source of the simulated failures that drive each stage's failure branch.
pub trait FailureInjector: Send + Sync {
    /// One Bernoulli trial: `true` with probability `probability`.
    fn should_fail(&self, probability: f64) -> bool;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Independent random trials, optionally from a fixed seed.
pub struct RandomFailureInjector {
    rng: Mutex<StdRng>,
}

impl RandomFailureInjector {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomFailureInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureInjector for RandomFailureInjector {
    fn should_fail(&self, probability: f64) -> bool {
        if probability.is_nan() || probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        lock(&self.rng).random::<f64>() < probability
    }
}

/// Ignores the probability and always answers the same.
#[derive(Debug, Clone, Copy)]
pub struct FixedFailureInjector {
    fail: bool,
}

impl FixedFailureInjector {
    pub fn always() -> Self {
        Self { fail: true }
    }

    pub fn never() -> Self {
        Self { fail: false }
    }
}

impl FailureInjector for FixedFailureInjector {
    fn should_fail(&self, _probability: f64) -> bool {
        self.fail
    }
}

/// Replays a fixed list of outcomes, then answers `fallback`.
pub struct ScriptedFailureInjector {
    outcomes: Mutex<VecDeque<bool>>,
    fallback: bool,
}

impl ScriptedFailureInjector {
    pub fn new(outcomes: impl IntoIterator<Item = bool>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            fallback: false,
        }
    }

    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn remaining(&self) -> usize {
        lock(&self.outcomes).len()
    }
}

impl FailureInjector for ScriptedFailureInjector {
    fn should_fail(&self, _probability: f64) -> bool {
        lock(&self.outcomes).pop_front().unwrap_or(self.fallback)
    }
}
