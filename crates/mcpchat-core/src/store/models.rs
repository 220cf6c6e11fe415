//! Stored conversation and message records

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::ToolCallRecord;

/// Longest title kept, in characters
pub const MAX_TITLE_CHARS: usize = 200;

/// Title given to new conversations
pub const DEFAULT_TITLE: &str = "New Chat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role column of the messages table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredRole {
    User,
    Assistant,
    ToolUse,
    ToolResult,
}

impl StoredRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoredRole::User => "user",
            StoredRole::Assistant => "assistant",
            StoredRole::ToolUse => "tool_use",
            StoredRole::ToolResult => "tool_result",
        }
    }

    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "user" => Some(StoredRole::User),
            "assistant" => Some(StoredRole::Assistant),
            "tool_use" => Some(StoredRole::ToolUse),
            "tool_result" => Some(StoredRole::ToolResult),
            _ => None,
        }
    }
}

impl fmt::Display for StoredRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub role: StoredRole,
    pub content: String,
    /// Tools run while producing this message; `None` when there were none
    pub tool_calls: Option<Vec<ToolCallRecord>>,
    pub created_at: DateTime<Utc>,
}

/// Clip a title to [`MAX_TITLE_CHARS`]
pub fn clip_title(title: &str) -> String {
    title.chars().take(MAX_TITLE_CHARS).collect()
}
