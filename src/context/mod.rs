//! Conversational context management for agents.
//!
//! This module keeps per-session message transcripts bounded by message count
//! and total character length, so that the context handed to a model stays
//! within its input budget.

pub mod context_manager;
pub mod message;

pub use context_manager::{ContextManager, ContextStats};
pub use message::{ContextMessage, MessageRole};
