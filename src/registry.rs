//! Lazily-initialized, process-wide [`MemoryRuntime`].
//!
//! Prefer constructing a [`MemoryRuntime`] and passing its handles around.
//! This registry exists for call sites that cannot be reached that way. The
//! runtime is installed at most once and lives until the process exits.

use crate::config::RecallConfig;
use crate::error::{RecallError, Result};
use crate::runtime::MemoryRuntime;
use std::sync::OnceLock;
use tracing::info;

static GLOBAL_RUNTIME: OnceLock<MemoryRuntime> = OnceLock::new();

/// Install the process-wide runtime from an explicit config.
///
/// # Errors
///
/// Fails if the config is invalid or a runtime is already installed.
pub fn init(config: RecallConfig) -> Result<&'static MemoryRuntime> {
    let candidate = MemoryRuntime::new(config)?;
    let mut installed = false;

    let runtime = GLOBAL_RUNTIME.get_or_init(|| {
        installed = true;
        candidate
    });

    if installed {
        info!("Global memory runtime installed");
        Ok(runtime)
    } else {
        Err(RecallError::ConfigError(
            "global memory runtime is already initialized".to_string(),
        ))
    }
}

/// The process-wide runtime, built from the environment on first use.
///
/// Concurrent first calls may each build a candidate, but only one is ever
/// installed and every caller receives that one.
pub fn runtime() -> Result<&'static MemoryRuntime> {
    if let Some(runtime) = GLOBAL_RUNTIME.get() {
        return Ok(runtime);
    }
    let candidate = MemoryRuntime::from_env()?;
    Ok(GLOBAL_RUNTIME.get_or_init(|| candidate))
}
