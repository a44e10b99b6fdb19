//! Runtime configuration.
//!
//! Defaults mirror `RetryPolicy::default()`. `from_env` overrides them from
//! `ROAM_RETRY_*` variables.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::retry::PolicyError;
use crate::retry::RetryPolicy;

pub const ENV_MAX_ATTEMPTS: &str = "ROAM_RETRY_MAX_ATTEMPTS";
pub const ENV_BASE_DELAY_MS: &str = "ROAM_RETRY_BASE_DELAY_MS";
pub const ENV_MULTIPLIER: &str = "ROAM_RETRY_MULTIPLIER";
pub const ENV_MAX_DELAY_MS: &str = "ROAM_RETRY_MAX_DELAY_MS";

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    Invalid { var: &'static str, value: String },
    /// The values parsed but do not form a usable policy.
    Policy(PolicyError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { var, value } => write!(f, "invalid value for {}: '{}'", var, value),
            Self::Policy(e) => write!(f, "invalid retry policy: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<PolicyError> for ConfigError {
    fn from(e: PolicyError) -> Self {
        Self::Policy(e)
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeConfig {
    pub retry: RetryPolicy,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds a config from an arbitrary variable source. Unset variables keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut retry = RetryPolicy::default();

        if let Some(n) = parse::<u32>(&lookup, ENV_MAX_ATTEMPTS)? {
            retry = retry.with_max_attempts(n);
        }
        if let Some(ms) = parse::<u64>(&lookup, ENV_BASE_DELAY_MS)? {
            retry = retry.with_base_delay(Duration::from_millis(ms));
        }
        if let Some(m) = parse::<f64>(&lookup, ENV_MULTIPLIER)? {
            retry = retry.with_multiplier(m);
        }
        if let Some(ms) = parse::<u64>(&lookup, ENV_MAX_DELAY_MS)? {
            retry = retry.with_max_delay(Duration::from_millis(ms));
        }

        retry.validate()?;
        Ok(Self { retry })
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<T>> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::Invalid { var, value: raw })
}
