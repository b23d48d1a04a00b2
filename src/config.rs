//! Configuration Module
//!
//! Holds the four construction parameters of the cache and the process wiring
//! that loads them from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Cache construction parameters.
///
/// All four values are required by [`Cache::new`](crate::Cache::new); the
/// engine never substitutes defaults on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of items the cache can hold
    pub capacity: usize,
    /// Lifetime applied to items that do not specify one
    pub default_lifetime: Duration,
    /// Interval between audit ticks
    pub audit_interval: Duration,
    /// Interval between sweep ticks
    pub sweep_interval: Duration,
}

impl CacheConfig {
    /// Creates a configuration from its four required values.
    pub fn new(
        capacity: usize,
        default_lifetime: Duration,
        audit_interval: Duration,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            capacity,
            default_lifetime,
            audit_interval,
            sweep_interval,
        }
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMCACHE_CAPACITY` - Maximum items (default: 1000)
    /// - `MEMCACHE_DEFAULT_LIFETIME_MS` - Default lifetime in ms (default: 300000)
    /// - `MEMCACHE_AUDIT_INTERVAL_MS` - Audit frequency in ms (default: 60000)
    /// - `MEMCACHE_SWEEP_INTERVAL_MS` - Sweep frequency in ms (default: 1000)
    ///
    /// Missing variables fall back to the defaults; a variable that is set but
    /// does not parse is an error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            capacity: read_env("MEMCACHE_CAPACITY")?.unwrap_or(defaults.capacity),
            default_lifetime: read_env("MEMCACHE_DEFAULT_LIFETIME_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.default_lifetime),
            audit_interval: read_env("MEMCACHE_AUDIT_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.audit_interval),
            sweep_interval: read_env("MEMCACHE_SWEEP_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.sweep_interval),
        })
    }

    /// Rejects values the engine cannot run with.
    ///
    /// A zero default lifetime is refused because a zero item lifetime already
    /// means "use the default".
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "capacity must be greater than zero".to_string(),
            ));
        }
        if self.default_lifetime.is_zero() {
            return Err(CacheError::InvalidConfig(
                "default lifetime must be greater than zero".to_string(),
            ));
        }
        if self.audit_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "audit interval must be greater than zero".to_string(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "sweep interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            default_lifetime: Duration::from_secs(300),
            audit_interval: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

fn read_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CacheError::InvalidConfig(format!("{name} has invalid value '{raw}'"))),
        Err(_) => Ok(None),
    }
}
