//! Bounded in-process memory for agents.
//!
//! [`LruMemory`] caches opaque values under string keys, evicting the least
//! recently used items when a size budget is exceeded and dropping items whose
//! TTL has elapsed. Value sizes come from a pluggable [`SizeEstimator`] and time
//! from a pluggable [`Clock`].

pub mod clock;
pub mod estimator;
pub mod item;
pub mod lru_memory;

pub use clock::{Clock, ManualClock, SystemClock};
pub use estimator::{FnSizeEstimator, JsonSizeEstimator, SizeEstimator};
pub use item::{ItemSummary, MemoryItem};
pub use lru_memory::{LruMemory, MemoryStats, MemoryUsage};
