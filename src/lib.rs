//! Bounded in-process memory and conversational context for research agents.
//!
//! - [`memory::LruMemory`]: a size- and TTL-bounded LRU store with tag grouping.
//! - [`context::ContextManager`]: per-session transcripts trimmed by count and length.
//! - [`runtime::MemoryRuntime`]: builds both from configuration and hands out shared handles.

pub mod config;
pub mod context;
pub mod error;
pub mod memory;
pub mod registry;
pub mod runtime;

pub use error::{RecallError, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::{ContextConfig, MemoryConfig, RecallConfig};
    pub use crate::context::{ContextManager, ContextMessage, MessageRole};
    pub use crate::error::{RecallError, Result};
    pub use crate::memory::{LruMemory, MemoryStats, MemoryUsage, SizeEstimator};
    pub use crate::runtime::MemoryRuntime;
}
