//! Pacing between publish attempts
//!
//! The runner asks its `Pacer` how long to wait after each attempt (except
//! the last one in a batch). `FixedPacer` waits a short fixed time after a
//! success and a longer one after a failure. `BackoffPacer` doubles the
//! failure delay on consecutive failures and adds jitter.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use rand::Rng;

use crate::config::{PacingConfig, PacingStrategy};
use crate::types::OutcomeKind;

/// Delay policy between attempts
pub trait Pacer: Send + Sync {
    /// Delay before the next attempt, given the outcome of the previous one
    fn delay_after(&self, outcome: OutcomeKind) -> Duration;

    /// Forget any state carried from a previous run
    fn reset(&self) {}
}

/// Build the pacer selected by configuration
pub fn from_config(config: &PacingConfig) -> Box<dyn Pacer> {
    match config.strategy {
        PacingStrategy::Fixed => Box::new(FixedPacer::new(
            config.success_delay,
            config.failure_delay,
        )),
        PacingStrategy::Backoff => Box::new(BackoffPacer::new(
            config.success_delay,
            config.failure_delay,
            config.max_delay,
        )),
    }
}

/// Fixed delays, no backoff, no jitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPacer {
    pub success_delay: Duration,
    pub failure_delay: Duration,
}

impl FixedPacer {
    pub fn new(success_delay: Duration, failure_delay: Duration) -> Self {
        Self {
            success_delay,
            failure_delay,
        }
    }
}

impl Default for FixedPacer {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(3))
    }
}

impl Pacer for FixedPacer {
    fn delay_after(&self, outcome: OutcomeKind) -> Duration {
        match outcome {
            OutcomeKind::Success => self.success_delay,
            OutcomeKind::Failure => self.failure_delay,
        }
    }
}

/// Exponential backoff with jitter on consecutive failures
///
/// After `n` consecutive failures the base delay is
/// `failure_delay * 2^(n-1)`, capped at `max_delay`, then scaled by a random
/// factor between 1 and 2, capped again. A success resets the streak.
#[derive(Debug)]
pub struct BackoffPacer {
    success_delay: Duration,
    failure_delay: Duration,
    max_delay: Duration,
    consecutive_failures: AtomicU32,
}

impl BackoffPacer {
    pub fn new(success_delay: Duration, failure_delay: Duration, max_delay: Duration) -> Self {
        Self {
            success_delay,
            failure_delay,
            max_delay: max_delay.max(failure_delay),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    fn base_delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.failure_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl Pacer for BackoffPacer {
    fn delay_after(&self, outcome: OutcomeKind) -> Duration {
        match outcome {
            OutcomeKind::Success => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                self.success_delay
            }
            OutcomeKind::Failure => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                add_jitter(self.base_delay(failures)).min(self.max_delay)
            }
        }
    }

    fn reset(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }
}

/// Scale `delay` by a random factor in `[1, 2)`, saturating at `Duration::MAX`
fn add_jitter(delay: Duration) -> Duration {
    let jitter_factor: f64 = rand::thread_rng().gen_range(0.0..1.0);
    Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
        .unwrap_or(Duration::MAX)
}
