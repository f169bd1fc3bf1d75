//! Display model
//!
//! A [`UiMessage`] is what a reader renders: one bubble per user prompt and
//! one per assistant turn, however many ledger steps or stream fragments it
//! was built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strand_types::{MessageRole, MessageStatus, OrderKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiStatus {
    Pending,
    Streaming,
    Success,
    Failed,
}

impl UiStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl From<MessageStatus> for UiStatus {
    fn from(status: MessageStatus) -> Self {
        match status {
            MessageStatus::Pending => Self::Pending,
            MessageStatus::Success => Self::Success,
            MessageStatus::Failed => Self::Failed,
        }
    }
}

/// Where a displayed message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiSource {
    Committed,
    Stream,
    Optimistic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolState {
    InputStreaming,
    InputAvailable,
    OutputAvailable,
    OutputError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiPart {
    Text {
        text: String,
    },
    Reasoning {
        text: String,
    },
    Tool {
        tool_call_id: String,
        tool_name: String,
        state: ToolState,
        #[serde(default)]
        input: Value,
        /// Raw input while it is still streaming
        #[serde(default, skip_serializing_if = "String::is_empty")]
        input_text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_text: Option<String>,
    },
    Source {
        source_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    File {
        media_type: String,
        url: String,
    },
    Data {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        data: Value,
    },
}

impl UiPart {
    pub fn tool_call(tool_call_id: impl Into<String>, tool_name: impl Into<String>, input: Value) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            state: ToolState::InputAvailable,
            input,
            input_text: String::new(),
            output: None,
            error_text: None,
        }
    }

    fn tool_call_id(&self) -> Option<&str> {
        match self {
            Self::Tool { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiMessage {
    /// Ledger id of the first folded step, stream id, or a local id
    pub id: String,
    /// Stable render key, `<thread>-<order>-<first step>`
    pub key: String,
    pub thread_id: String,
    pub order: u64,
    /// Last step folded into this message
    pub step_order: u64,
    pub role: MessageRole,
    pub status: UiStatus,
    pub source: UiSource,
    pub parts: Vec<UiPart>,
    /// Concatenated text parts
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UiMessage {
    pub fn new(
        id: impl Into<String>,
        thread_id: impl Into<String>,
        key: OrderKey,
        role: MessageRole,
        status: UiStatus,
        source: UiSource,
    ) -> Self {
        let thread_id = thread_id.into();
        Self {
            id: id.into(),
            key: render_key(&thread_id, key),
            thread_id,
            order: key.order,
            step_order: key.step_order,
            role,
            status,
            source,
            parts: Vec::new(),
            text: String::new(),
            agent_name: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn order_key(&self) -> OrderKey {
        OrderKey::new(self.order, self.step_order)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Extend the trailing text part, or open a new one.
    pub fn push_text(&mut self, text: &str) {
        match self.parts.last_mut() {
            Some(UiPart::Text { text: current }) => current.push_str(text),
            _ => self.parts.push(UiPart::Text {
                text: text.to_string(),
            }),
        }
        self.text.push_str(text);
    }

    /// Extend the trailing reasoning part, or open a new one.
    pub fn push_reasoning(&mut self, text: &str) {
        match self.parts.last_mut() {
            Some(UiPart::Reasoning { text: current }) => current.push_str(text),
            _ => self.parts.push(UiPart::Reasoning {
                text: text.to_string(),
            }),
        }
    }

    pub fn tool_mut(&mut self, tool_call_id: &str) -> Option<&mut UiPart> {
        self.parts
            .iter_mut()
            .find(|p| p.tool_call_id() == Some(tool_call_id))
    }

    /// Recompute `text` after parts were edited in place.
    pub fn sync_text(&mut self) {
        self.text = self
            .parts
            .iter()
            .filter_map(|p| match p {
                UiPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
    }
}

pub(crate) fn render_key(thread_id: &str, key: OrderKey) -> String {
    format!("{}-{}-{}", thread_id, key.order, key.step_order)
}
