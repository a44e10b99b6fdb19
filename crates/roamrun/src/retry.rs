//! # Migration retry policy
//!
//! Exponential backoff for the relocation signal. Only `ObjectMigrating` is
//! retried; any other outcome ends the sequence at the attempt that produced it.
//!
//! ## Invariants
//!
//! - At most `max_attempts` attempts are made (1 initial + `max_attempts - 1` retries).
//! - The delay before attempt `k` (k ≥ 2) is `base_delay × multiplier^(k-1)`, capped
//!   at `max_delay`.
//! - When every attempt reports `ObjectMigrating`, the last one is returned as is.
//!   Exhaustion is not an error kind of its own.
//! - Sleeping suspends only the calling task. Dropping the returned future abandons
//!   the sequence at an attempt boundary.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::debug;
use tracing::warn;

use roamrpc::error::Result;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 7;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(10);
pub const DEFAULT_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub enum PolicyError {
    NoAttempts,
    ShrinkingMultiplier(f64),
    BaseExceedsMax { base: Duration, max: Duration },
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAttempts => write!(f, "retry policy must allow at least one attempt"),
            Self::ShrinkingMultiplier(m) => {
                write!(f, "backoff multiplier must be a finite value >= 1.0, got {}", m)
            }
            Self::BaseExceedsMax { base, max } => {
                write!(f, "base delay {:?} exceeds max delay {:?}", base, max)
            }
        }
    }
}

impl std::error::Error for PolicyError {}

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    multiplier: f64,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never sleeps. Handy in tests.
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn validate(&self) -> std::result::Result<(), PolicyError> {
        if self.max_attempts == 0 {
            return Err(PolicyError::NoAttempts);
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(PolicyError::ShrinkingMultiplier(self.multiplier));
        }
        if self.base_delay > self.max_delay {
            return Err(PolicyError::BaseExceedsMax {
                base: self.base_delay,
                max: self.max_delay,
            });
        }
        Ok(())
    }

    /// How long to wait before the 1-based `attempt`. The first attempt never waits.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            Duration::ZERO
        }
    }

    /// Runs `op` until it stops reporting `ObjectMigrating` or the attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // a zero-attempt policy still makes the call once
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let delay = self.delay_before(attempt);
            if !delay.is_zero() {
                debug!(attempt, ?delay, "backing off before retry");
                tokio::time::sleep(delay).await;
            }

            match op(attempt).await {
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    debug!(attempt, "object migrating, will retry");
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    warn!(attempts = attempt, "object still migrating, giving up");
                    return Err(e);
                }
                outcome => return outcome,
            }
        }
    }
}
