//! Process-level wiring of the memory store and the context manager.
//!
//! Build one [`MemoryRuntime`] at startup and hand its handles to whatever
//! needs them. Handles are cheap clones that share state, so every consumer
//! sees the same cache and the same transcripts.
//!
//! ```
//! use recall::config::RecallConfig;
//! use recall::context::MessageRole;
//! use recall::runtime::MemoryRuntime;
//! use serde_json::json;
//!
//! let runtime = MemoryRuntime::new(RecallConfig::default()).unwrap();
//!
//! let memory = runtime.memory();
//! memory.put("template:pcr", json!({"steps": 3}));
//! assert!(runtime.memory().get("template:pcr").is_some());
//!
//! runtime.context().add_message("session-1", MessageRole::User, "Summarize run 4");
//! assert_eq!(runtime.context().get_context("session-1").len(), 1);
//! ```

use crate::config::RecallConfig;
use crate::context::ContextManager;
use crate::error::Result;
use crate::memory::LruMemory;
use tracing::info;

/// The shared cache and context manager of one process.
#[derive(Debug, Clone)]
pub struct MemoryRuntime {
    memory: LruMemory,
    context: ContextManager,
}

impl MemoryRuntime {
    pub fn new(config: RecallConfig) -> Result<Self> {
        config.validate()?;
        let memory = LruMemory::new(config.memory.clone())?;
        let context = ContextManager::new(config.context.clone())?;

        info!(
            "Memory runtime ready: {} bytes, ttl {}s, context {} chars / {} messages",
            config.memory.max_size_bytes,
            config.memory.ttl.as_secs(),
            config.context.max_context_length,
            config.context.max_history
        );

        Ok(Self { memory, context })
    }

    /// Build from `RECALL_*` environment variables and `.env`.
    pub fn from_env() -> Result<Self> {
        Self::new(RecallConfig::from_env()?)
    }

    pub fn from_parts(memory: LruMemory, context: ContextManager) -> Self {
        Self { memory, context }
    }

    /// A handle to the shared memory store.
    pub fn memory(&self) -> LruMemory {
        self.memory.clone()
    }

    /// A handle to the shared context manager.
    pub fn context(&self) -> ContextManager {
        self.context.clone()
    }
}
