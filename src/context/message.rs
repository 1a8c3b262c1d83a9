//! Messages recorded in session transcripts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Role of a message in a conversation transcript.
///
/// The common chat roles have their own variants; any other label (a
/// `"function"` role, an agent's name) is kept verbatim in `Other`. Roles
/// serialize as plain lowercase strings.
///
/// ```
/// use recall::context::MessageRole;
///
/// assert_eq!(MessageRole::from("assistant"), MessageRole::Assistant);
/// assert_eq!(MessageRole::from("researcher"), MessageRole::Other("researcher".to_string()));
/// assert_eq!(MessageRole::from("researcher").as_str(), "researcher");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
    #[serde(untagged)]
    Other(String),
}

impl MessageRole {
    pub fn as_str(&self) -> &str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
            MessageRole::Other(role) => role,
        }
    }
}

impl From<&str> for MessageRole {
    fn from(role: &str) -> Self {
        match role {
            "system" => MessageRole::System,
            "user" => MessageRole::User,
            "assistant" => MessageRole::Assistant,
            "tool" => MessageRole::Tool,
            other => MessageRole::Other(other.to_string()),
        }
    }
}

impl From<String> for MessageRole {
    fn from(role: String) -> Self {
        MessageRole::from(role.as_str())
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a session transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl ContextMessage {
    pub fn new(
        role: impl Into<MessageRole>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
        metadata: HashMap<String, Value>,
    ) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp,
            metadata,
        }
    }

    /// Content length in characters, the unit of the context budget.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}
