use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::message::MessageRole;
use crate::order::OrderKey;

/// Format tag for streams carrying UI message chunks
pub const UI_MESSAGE_CHUNK_FORMAT: &str = "UIMessageChunk";
/// Format tag for streams carrying flat text stream parts
pub const TEXT_STREAM_PART_FORMAT: &str = "TextStreamPart";

/// Position in a stream's delta log.
///
/// Counts raw parts consumed by the writer, so it only ever grows. A cursor
/// returned by one read is always valid input to the next read of the same
/// stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub u64);

impl Cursor {
    pub fn advance(self, by: u64) -> Self {
        Self(self.0 + by)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Streaming,
    Finished,
    Aborted,
}

impl StreamStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Streaming)
    }
}

fn default_role() -> MessageRole {
    MessageRole::Assistant
}

/// Descriptor of one in-flight generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    pub stream_id: String,
    pub thread_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub order: u64,
    pub step_order: u64,
    #[serde(default = "default_role")]
    pub role: MessageRole,
    /// `UIMessageChunk`, `TextStreamPart`, or absent for legacy writers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub status: StreamStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StreamMessage {
    pub fn new(thread_id: impl Into<String>, key: OrderKey, format: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            stream_id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            user_id: None,
            order: key.order,
            step_order: key.step_order,
            role: MessageRole::Assistant,
            format,
            status: StreamStatus::Streaming,
            abort_reason: None,
            agent_name: None,
            model: None,
            provider: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> OrderKey {
        OrderKey::new(self.order, self.step_order)
    }
}

/// One compacted segment of a stream's delta log.
///
/// Covers raw parts `[start, end)`; `parts` holds their compacted form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaRecord {
    pub stream_id: String,
    pub start: Cursor,
    pub end: Cursor,
    pub parts: Vec<serde_json::Value>,
}

/// Result of one incremental read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaBatch {
    pub stream_id: String,
    pub deltas: Vec<DeltaRecord>,
    pub cursor: Cursor,
    pub status: StreamStatus,
}

impl DeltaBatch {
    /// Batch for a stream that no longer exists: nothing more will arrive.
    pub fn finished_empty(stream_id: impl Into<String>, cursor: Cursor) -> Self {
        Self {
            stream_id: stream_id.into(),
            deltas: Vec::new(),
            cursor,
            status: StreamStatus::Finished,
        }
    }

    /// Every compacted fragment in the batch, in log order.
    pub fn fragments(&self) -> impl Iterator<Item = &serde_json::Value> {
        self.deltas.iter().flat_map(|d| d.parts.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.iter().all(|d| d.parts.is_empty())
    }
}
