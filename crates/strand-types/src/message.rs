use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::order::OrderKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Success,
    Failed,
}

impl MessageStatus {
    /// Success and failed messages never change status again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// Message content: either plain text or typed parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },

    Reasoning {
        text: String,
    },

    ToolCall {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        args: serde_json::Value,
    },

    ToolResult {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        result: serde_json::Value,
        #[serde(default)]
        is_error: bool,
    },

    Source {
        source_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    File {
        media_type: String,
        /// Base64 payload or URL; raw bytes are never stored.
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
}

impl Content {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Concatenated text of every text part, `None` when there is none.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Parts(parts) => {
                let texts: Vec<&str> = parts
                    .iter()
                    .filter_map(|p| match p {
                        ContentPart::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect();
                if texts.is_empty() {
                    None
                } else {
                    Some(texts.join(""))
                }
            }
        }
    }

    pub fn has_tool_parts(&self) -> bool {
        match self {
            Self::Text(_) => false,
            Self::Parts(parts) => parts.iter().any(|p| {
                matches!(p, ContentPart::ToolCall { .. } | ContentPart::ToolResult { .. })
            }),
        }
    }

    pub fn parts(&self) -> Vec<ContentPart> {
        match self {
            Self::Text(s) => vec![ContentPart::Text { text: s.clone() }],
            Self::Parts(parts) => parts.clone(),
        }
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Role plus content, as produced by the caller before the ledger assigns a key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: Content,
}

impl Message {
    pub fn user(content: impl Into<Content>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<Content>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<Content>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<Content>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
        }
    }

    /// Tool traffic: tool role or any tool-call / tool-result part.
    pub fn is_tool(&self) -> bool {
        self.role == MessageRole::Tool || self.content.has_tool_parts()
    }
}

/// Ledger entry: one durable message inside a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDoc {
    pub id: String,
    pub thread_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub order: u64,
    pub step_order: u64,
    pub status: MessageStatus,
    pub message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub tool: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MessageDoc {
    pub fn key(&self) -> OrderKey {
        OrderKey::new(self.order, self.step_order)
    }

    pub fn role(&self) -> MessageRole {
        self.message.role
    }
}
