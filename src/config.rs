//! Configuration for the memory store and the context manager.
//!
//! Values are supplied at construction time by the owning process. Each config
//! has sensible defaults and can also be read from `RECALL_*` environment
//! variables (a `.env` file in the working directory is loaded first).
//!
//! | Variable                     | Field                              | Default |
//! |------------------------------|------------------------------------|---------|
//! | `RECALL_MAX_SIZE_MB`         | [`MemoryConfig::max_size_bytes`]   | 100     |
//! | `RECALL_TTL_DAYS`            | [`MemoryConfig::ttl`]              | 30      |
//! | `RECALL_FALLBACK_SIZE_BYTES` | [`MemoryConfig::fallback_size_bytes`] | 1024 |
//! | `RECALL_MAX_CONTEXT_LENGTH`  | [`ContextConfig::max_context_length`] | 8000 |
//! | `RECALL_MAX_HISTORY`         | [`ContextConfig::max_history`]     | 10      |

use crate::error::{RecallError, Result};
use std::str::FromStr;
use std::time::Duration;

const BYTES_PER_MB: usize = 1024 * 1024;
const SECONDS_PER_DAY: u64 = 24 * 3600;

/// Size estimate used when a value cannot be serialized.
pub const DEFAULT_FALLBACK_SIZE_BYTES: usize = 1024;

/// Configuration for [`LruMemory`](crate::memory::LruMemory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Maximum aggregate estimated size of all items.
    pub max_size_bytes: usize,
    /// Absolute lifetime of an item, measured from its insertion.
    pub ttl: Duration,
    /// Size assumed for values the estimator cannot measure.
    pub fallback_size_bytes: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 100 * BYTES_PER_MB,
            ttl: Duration::from_secs(30 * SECONDS_PER_DAY),
            fallback_size_bytes: DEFAULT_FALLBACK_SIZE_BYTES,
        }
    }
}

impl MemoryConfig {
    /// Largest accepted capacity. An item may be up to half of it, so the
    /// running total before eviction always fits in a `usize`.
    pub const MAX_SIZE_BYTES: usize = usize::MAX / 2;

    /// Create a config with an explicit capacity and TTL.
    pub fn new(max_size_bytes: usize, ttl_seconds: u64) -> Self {
        Self {
            max_size_bytes,
            ttl: Duration::from_secs(ttl_seconds),
            ..Default::default()
        }
    }

    /// Set the size assumed for values that cannot be estimated.
    pub fn with_fallback_size(mut self, fallback_size_bytes: usize) -> Self {
        self.fallback_size_bytes = fallback_size_bytes;
        self
    }

    /// Read the config from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let max_size_mb = env_or("RECALL_MAX_SIZE_MB", defaults.max_size_bytes / BYTES_PER_MB)?;
        let ttl_days = env_or("RECALL_TTL_DAYS", defaults.ttl.as_secs() / SECONDS_PER_DAY)?;
        let fallback_size_bytes =
            env_or("RECALL_FALLBACK_SIZE_BYTES", defaults.fallback_size_bytes)?;

        let config = Self {
            max_size_bytes: max_size_mb.checked_mul(BYTES_PER_MB).ok_or_else(|| {
                RecallError::ConfigError(format!("RECALL_MAX_SIZE_MB too large: {}", max_size_mb))
            })?,
            ttl: Duration::from_secs(ttl_days.saturating_mul(SECONDS_PER_DAY)),
            fallback_size_bytes,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that could never hold an item.
    pub fn validate(&self) -> Result<()> {
        if self.max_size_bytes == 0 {
            return Err(RecallError::ConfigError("max_size_bytes must be positive".to_string()));
        }
        if self.max_size_bytes > Self::MAX_SIZE_BYTES {
            return Err(RecallError::ConfigError(format!(
                "max_size_bytes must not exceed {}",
                Self::MAX_SIZE_BYTES
            )));
        }
        if self.fallback_size_bytes == 0 {
            return Err(RecallError::ConfigError(
                "fallback_size_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for [`ContextManager`](crate::context::ContextManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Character budget for one session transcript.
    pub max_context_length: usize,
    /// Maximum number of messages kept per session.
    pub max_history: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_length: 8000,
            max_history: 10,
        }
    }
}

impl ContextConfig {
    pub fn new(max_context_length: usize, max_history: usize) -> Self {
        Self {
            max_context_length,
            max_history,
        }
    }

    /// Read the config from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            max_context_length: env_or("RECALL_MAX_CONTEXT_LENGTH", defaults.max_context_length)?,
            max_history: env_or("RECALL_MAX_HISTORY", defaults.max_history)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_context_length == 0 {
            return Err(RecallError::ConfigError(
                "max_context_length must be positive".to_string(),
            ));
        }
        if self.max_history == 0 {
            return Err(RecallError::ConfigError("max_history must be positive".to_string()));
        }
        Ok(())
    }
}

/// Combined configuration for a [`MemoryRuntime`](crate::runtime::MemoryRuntime).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecallConfig {
    pub memory: MemoryConfig,
    pub context: ContextConfig,
}

impl RecallConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            memory: MemoryConfig::from_env()?,
            context: ContextConfig::from_env()?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.memory.validate()?;
        self.context.validate()
    }
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => parse_setting(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_setting<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| {
        RecallError::ConfigError(format!("{} has invalid value {:?}: {}", name, raw, e))
    })
}
