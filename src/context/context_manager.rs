//! Per-session conversation transcripts with bounded size.
//!
//! This module provides [`ContextManager`], a thread-safe store of ordered
//! message lists keyed by session id. Every append trims the session from the
//! oldest end so it stays within both a message-count limit and a total
//! character budget, keeping conversational context inside a model's input
//! window.
//!
//! # Examples
//!
//! ```
//! use recall::config::ContextConfig;
//! use recall::context::{ContextManager, MessageRole};
//!
//! let contexts = ContextManager::new(ContextConfig::new(20, 10)).unwrap();
//!
//! contexts.add_message("s1", MessageRole::User, "0123456789");
//! contexts.add_message("s1", MessageRole::Assistant, "0123456789");
//! contexts.add_message("s1", MessageRole::User, "01234");
//!
//! let transcript = contexts.get_context("s1");
//! assert_eq!(transcript.len(), 2);
//! assert_eq!(contexts.context_length("s1"), 15);
//! ```

use super::message::{ContextMessage, MessageRole};
use crate::config::ContextConfig;
use crate::error::Result;
use crate::memory::clock::{Clock, SystemClock};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Aggregate counters across all sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextStats {
    pub total_sessions: usize,
    pub total_messages: usize,
    pub avg_messages_per_session: f64,
    pub max_context_length: usize,
    pub max_history: usize,
}

/// Thread-safe manager of per-session message transcripts.
///
/// Clones share the same transcripts. All sessions are guarded by one lock.
#[derive(Clone)]
pub struct ContextManager {
    sessions: Arc<Mutex<HashMap<String, VecDeque<ContextMessage>>>>,
    config: ContextConfig,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ContextManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ContextManager {
    /// Create a manager stamping messages with the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`RecallError::ConfigError`](crate::RecallError::ConfigError)
    /// if either limit is zero.
    pub fn new(config: ContextConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a manager stamping messages with `clock`.
    pub fn with_clock(config: ContextConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            config,
            clock,
        })
    }

    /// The limits this manager trims to.
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Append a message without metadata.
    ///
    /// `role` accepts a [`MessageRole`] or any role name.
    ///
    /// # Examples
    ///
    /// ```
    /// use recall::config::ContextConfig;
    /// use recall::context::{ContextManager, MessageRole};
    ///
    /// let contexts = ContextManager::new(ContextConfig::new(8000, 3)).unwrap();
    /// for turn in ["m1", "m2", "m3", "m4"] {
    ///     contexts.add_message("s1", MessageRole::User, turn);
    /// }
    /// contexts.add_message("s1", "reviewer", "m5");
    ///
    /// let transcript = contexts.get_context("s1");
    /// let contents: Vec<&str> = transcript.iter().map(|m| m.content.as_str()).collect();
    /// assert_eq!(contents, vec!["m3", "m4", "m5"]);
    /// assert_eq!(transcript[2].role.as_str(), "reviewer");
    /// ```
    pub fn add_message(
        &self,
        session_id: &str,
        role: impl Into<MessageRole>,
        content: impl Into<String>,
    ) {
        self.add_message_with_metadata(session_id, role, content, HashMap::new());
    }

    /// Append a message to a session, creating the session if needed, then
    /// trim the oldest messages until the session fits its limits.
    ///
    /// The character budget never removes the last remaining message, even
    /// when that message alone exceeds it.
    pub fn add_message_with_metadata(
        &self,
        session_id: &str,
        role: impl Into<MessageRole>,
        content: impl Into<String>,
        metadata: HashMap<String, Value>,
    ) {
        let mut sessions = self.sessions.lock();
        let message = ContextMessage::new(role, content, self.clock.now(), metadata);

        let transcript = sessions.entry(session_id.to_string()).or_default();
        transcript.push_back(message);
        self.trim(session_id, transcript);
    }

    /// A copy of the session's transcript, oldest first.
    ///
    /// Unknown sessions yield an empty list.
    pub fn get_context(&self, session_id: &str) -> Vec<ContextMessage> {
        self.sessions
            .lock()
            .get(session_id)
            .map(|transcript| transcript.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop a session's transcript. Returns whether the session existed.
    pub fn clear_context(&self, session_id: &str) -> bool {
        self.sessions.lock().remove(session_id).is_some()
    }

    /// Total characters currently held for a session.
    pub fn context_length(&self, session_id: &str) -> usize {
        self.sessions
            .lock()
            .get(session_id)
            .map(|transcript| transcript.iter().map(ContextMessage::char_len).sum())
            .unwrap_or(0)
    }

    /// Ids of all live sessions, sorted.
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Aggregate counts across sessions, alongside the configured limits.
    pub fn get_context_stats(&self) -> ContextStats {
        let sessions = self.sessions.lock();
        let total_sessions = sessions.len();
        let total_messages: usize = sessions.values().map(VecDeque::len).sum();

        let avg_messages_per_session = if total_sessions > 0 {
            total_messages as f64 / total_sessions as f64
        } else {
            0.0
        };

        ContextStats {
            total_sessions,
            total_messages,
            avg_messages_per_session,
            max_context_length: self.config.max_context_length,
            max_history: self.config.max_history,
        }
    }

    fn trim(&self, session_id: &str, transcript: &mut VecDeque<ContextMessage>) {
        while transcript.len() > self.config.max_history {
            transcript.pop_front();
            debug!("Removed old message from session {}", session_id);
        }

        let mut total_length: usize = transcript.iter().map(ContextMessage::char_len).sum();

        while total_length > self.config.max_context_length && transcript.len() > 1 {
            if let Some(removed) = transcript.pop_front() {
                total_length -= removed.char_len();
                debug!("Trimmed message from session {} due to length limit", session_id);
            }
        }
    }
}
