use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compactor::StreamPart;

fn is_false(b: &bool) -> bool {
    !*b
}

/// Flat text stream part, as emitted by a generation step
///
/// Older writers used `textDelta` / `args` / `result` field names and a bare
/// `reasoning` type; those are accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TextStreamPart {
    #[serde(rename_all = "camelCase")]
    TextDelta {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(alias = "textDelta")]
        text: String,
    },

    #[serde(rename_all = "camelCase", alias = "reasoning")]
    ReasoningDelta {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(alias = "textDelta")]
        text: String,
    },

    #[serde(rename_all = "camelCase")]
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        #[serde(default, alias = "args")]
        input: Value,
    },

    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        #[serde(default, alias = "result")]
        output: Value,
        #[serde(default, skip_serializing_if = "is_false")]
        is_error: bool,
    },

    #[serde(rename_all = "camelCase")]
    Source {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    File {
        file: FilePayload,
    },

    Start,
    Finish,
    StartStep,
    FinishStep,

    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    /// Raw bytes; never survives compaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uint8_array: Option<Vec<u8>>,
}

impl TextStreamPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextDelta {
            id: None,
            text: text.into(),
        }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::ReasoningDelta {
            id: None,
            text: text.into(),
        }
    }
}

impl StreamPart for TextStreamPart {
    fn retain(self) -> Option<Self> {
        match self {
            Self::Start | Self::Finish | Self::StartStep | Self::FinishStep | Self::Unknown => None,
            Self::TextDelta { ref text, .. } | Self::ReasoningDelta { ref text, .. }
                if text.is_empty() =>
            {
                None
            }
            Self::File { mut file } => {
                file.uint8_array = None;
                Some(Self::File { file })
            }
            other => Some(other),
        }
    }

    fn merge(&mut self, next: Self) -> Option<Self> {
        match (self, next) {
            (Self::TextDelta { id, text }, Self::TextDelta { id: next_id, text: more })
                if *id == next_id =>
            {
                text.push_str(&more);
                None
            }
            (
                Self::ReasoningDelta { id, text },
                Self::ReasoningDelta {
                    id: next_id,
                    text: more,
                },
            ) if *id == next_id => {
                text.push_str(&more);
                None
            }
            (_, next) => Some(next),
        }
    }

    fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::trace!("dropping undecodable stream part: {}", e);
            Self::Unknown
        })
    }

    fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
