use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::compactor::StreamPart;

/// Structured UI message chunk
///
/// Chunks address the part they extend (`id`, `toolCallId`), so deltas for
/// interleaved parts can share one stream. `data-*` chunks carry a
/// caller-defined suffix and are decoded by hand in [`StreamPart::from_value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiMessageChunk {
    #[serde(rename_all = "camelCase")]
    Start {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    Finish,
    StartStep,
    FinishStep,
    Abort,
    MessageMetadata,

    #[serde(rename_all = "camelCase")]
    Error {
        #[serde(default)]
        error_text: String,
    },

    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },

    ReasoningStart {
        id: String,
    },
    ReasoningDelta {
        id: String,
        delta: String,
    },
    ReasoningEnd {
        id: String,
    },

    #[serde(rename_all = "camelCase")]
    ToolInputStart {
        tool_call_id: String,
        tool_name: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolInputDelta {
        tool_call_id: String,
        input_text_delta: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolInputAvailable {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(rename_all = "camelCase")]
    ToolOutputAvailable {
        tool_call_id: String,
        #[serde(default)]
        output: Value,
    },
    #[serde(rename_all = "camelCase")]
    ToolOutputError {
        tool_call_id: String,
        error_text: String,
    },

    #[serde(rename_all = "camelCase")]
    SourceUrl {
        source_id: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SourceDocument {
        source_id: String,
        media_type: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    File {
        url: String,
        media_type: String,
    },

    /// `data-<name>` chunk
    #[serde(skip)]
    Data {
        name: String,
        id: Option<String>,
        data: Value,
    },

    #[serde(other)]
    Unknown,
}

impl UiMessageChunk {
    pub fn text_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::TextDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    pub fn reasoning_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::ReasoningDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }
}

impl StreamPart for UiMessageChunk {
    fn retain(self) -> Option<Self> {
        match self {
            Self::Start { .. }
            | Self::Finish
            | Self::StartStep
            | Self::FinishStep
            | Self::Abort
            | Self::MessageMetadata
            | Self::Error { .. }
            | Self::TextStart { .. }
            | Self::TextEnd { .. }
            | Self::ReasoningStart { .. }
            | Self::ReasoningEnd { .. }
            | Self::Unknown => None,
            Self::TextDelta { ref delta, .. } | Self::ReasoningDelta { ref delta, .. }
                if delta.is_empty() =>
            {
                None
            }
            Self::ToolInputDelta {
                ref input_text_delta,
                ..
            } if input_text_delta.is_empty() => None,
            other => Some(other),
        }
    }

    fn merge(&mut self, next: Self) -> Option<Self> {
        match (self, next) {
            (Self::TextDelta { id, delta }, Self::TextDelta { id: next_id, delta: more })
                if *id == next_id =>
            {
                delta.push_str(&more);
                None
            }
            (
                Self::ReasoningDelta { id, delta },
                Self::ReasoningDelta {
                    id: next_id,
                    delta: more,
                },
            ) if *id == next_id => {
                delta.push_str(&more);
                None
            }
            (
                Self::ToolInputDelta {
                    tool_call_id,
                    input_text_delta,
                },
                Self::ToolInputDelta {
                    tool_call_id: next_id,
                    input_text_delta: more,
                },
            ) if *tool_call_id == next_id => {
                input_text_delta.push_str(&more);
                None
            }
            // A later data chunk with the same identity replaces the earlier one.
            (
                Self::Data { name, id, data },
                Self::Data {
                    name: next_name,
                    id: next_id,
                    data: next_data,
                },
            ) if id.is_some() && *name == next_name && *id == next_id => {
                *data = next_data;
                None
            }
            (_, next) => Some(next),
        }
    }

    fn from_value(value: Value) -> Self {
        let data_name = value
            .get("type")
            .and_then(Value::as_str)
            .and_then(|t| t.strip_prefix("data-"))
            .map(str::to_string);

        if let Some(name) = data_name {
            return Self::Data {
                name,
                id: value.get("id").and_then(Value::as_str).map(str::to_string),
                data: value.get("data").cloned().unwrap_or(Value::Null),
            };
        }

        serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::trace!("dropping undecodable stream part: {}", e);
            Self::Unknown
        })
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Data { name, id, data } => {
                let mut value = json!({ "type": format!("data-{}", name), "data": data });
                if let Some(id) = id {
                    value["id"] = Value::String(id.clone());
                }
                value
            }
            other => serde_json::to_value(other).unwrap_or(Value::Null),
        }
    }
}
