//! Configuration Module
//!
//! Handles loading and validating cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Default maximum entry age in milliseconds.
pub const DEFAULT_MAX_AGE_MS: u64 = 600_000_000;

/// Default maximum number of resident keys.
pub const DEFAULT_MAX_SIZE: usize = 100;

/// Smallest period the background sweep will run at.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Cache configuration parameters.
///
/// Values can be loaded from environment variables; anything missing falls
/// back to the defaults, anything malformed is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entries older than this are purged
    pub ttl: Duration,
    /// Hard cap on concurrently resident keys
    pub max_size: usize,
    /// Schedule a one-shot removal per entry in addition to the sweep
    pub expiry_timers: bool,
}

impl CacheConfig {
    /// Creates a config with per-entry expiry timers enabled.
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            ttl,
            max_size,
            expiry_timers: true,
        }
    }

    /// Enables or disables the per-entry one-shot timers.
    ///
    /// With timers disabled, expiry relies on the periodic sweep and the
    /// age check performed by `get`.
    pub fn with_expiry_timers(mut self, enabled: bool) -> Self {
        self.expiry_timers = enabled;
        self
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_AGE_MS` - Entry TTL in milliseconds (default: 600000000)
    /// - `CACHE_MAX_SIZE` - Maximum resident keys (default: 100)
    /// - `CACHE_EXPIRY_TIMERS` - `true`/`false`, per-entry timers (default: true)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_age_ms = parse_var(&lookup, "CACHE_MAX_AGE_MS")?.unwrap_or(DEFAULT_MAX_AGE_MS);
        let max_size = parse_var(&lookup, "CACHE_MAX_SIZE")?.unwrap_or(DEFAULT_MAX_SIZE);
        let expiry_timers = parse_var(&lookup, "CACHE_EXPIRY_TIMERS")?.unwrap_or(true);

        let config = Self::new(Duration::from_millis(max_age_ms), max_size)
            .with_expiry_timers(expiry_timers);
        config.validate()?;
        Ok(config)
    }

    /// Rejects a zero TTL or a zero capacity.
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(CacheError::InvalidConfig(
                "ttl must be greater than zero".to_string(),
            ));
        }
        if self.max_size == 0 {
            return Err(CacheError::InvalidConfig(
                "max_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Period of the background sweep: half the TTL.
    pub fn sweep_interval(&self) -> Duration {
        (self.ttl / 2).max(MIN_SWEEP_INTERVAL)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_MAX_AGE_MS), DEFAULT_MAX_SIZE)
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            CacheError::InvalidConfig(format!("{} has an invalid value: {:?}", name, raw))
        }),
    }
}
