//! Format dispatch for stream fragments
//!
//! Each stream picks its reducer once, from the format tag on its descriptor.
//! An unknown tag yields [`Reducer::Stalled`], which ignores every fragment so
//! the reader keeps whatever it had.

use std::collections::HashMap;

use serde_json::Value;
use strand_stream::{StreamFormat, StreamPart, TextStreamPart, UiMessageChunk};
use strand_types::StreamMessage;
use tracing::warn;

use crate::ui::{ToolState, UiMessage, UiPart};

/// Part positions for chunks that address their part by id
#[derive(Debug, Clone, Default)]
pub struct ChunkState {
    text: HashMap<String, usize>,
    reasoning: HashMap<String, usize>,
}

#[derive(Debug, Clone)]
pub enum Reducer {
    UiChunks(ChunkState),
    /// `TextStreamPart` and legacy streams
    TextParts,
    Stalled { format: String },
}

impl Reducer {
    pub fn for_stream(stream: &StreamMessage) -> Self {
        match StreamFormat::from_tag(stream.format.as_deref()) {
            Ok(StreamFormat::UiMessageChunk) => Self::UiChunks(ChunkState::default()),
            Ok(StreamFormat::TextStreamPart | StreamFormat::Legacy) => Self::TextParts,
            Err(e) => {
                warn!(
                    stream_id = %stream.stream_id,
                    format = %e.0,
                    "format inconsistency, stream left stalled"
                );
                Self::Stalled { format: e.0 }
            }
        }
    }

    pub fn is_stalled(&self) -> bool {
        matches!(self, Self::Stalled { .. })
    }

    /// Fold one stored fragment into `message`.
    pub fn fold(&mut self, message: &mut UiMessage, fragment: &Value) {
        match self {
            Self::UiChunks(state) => {
                fold_chunk(state, message, UiMessageChunk::from_value(fragment.clone()))
            }
            Self::TextParts => fold_text_part(message, TextStreamPart::from_value(fragment.clone())),
            Self::Stalled { .. } => {}
        }
    }
}

fn fold_chunk(state: &mut ChunkState, message: &mut UiMessage, chunk: UiMessageChunk) {
    match chunk {
        UiMessageChunk::TextDelta { id, delta } => {
            match state.text.get(&id).copied() {
                Some(i) => {
                    if let Some(UiPart::Text { text }) = message.parts.get_mut(i) {
                        text.push_str(&delta);
                    }
                }
                None => {
                    state.text.insert(id, message.parts.len());
                    message.parts.push(UiPart::Text { text: delta });
                }
            }
            message.sync_text();
        }
        UiMessageChunk::ReasoningDelta { id, delta } => match state.reasoning.get(&id).copied() {
            Some(i) => {
                if let Some(UiPart::Reasoning { text }) = message.parts.get_mut(i) {
                    text.push_str(&delta);
                }
            }
            None => {
                state.reasoning.insert(id, message.parts.len());
                message.parts.push(UiPart::Reasoning { text: delta });
            }
        },
        UiMessageChunk::ToolInputStart {
            tool_call_id,
            tool_name,
        } => {
            if message.tool_mut(&tool_call_id).is_none() {
                message.parts.push(UiPart::Tool {
                    tool_call_id,
                    tool_name,
                    state: ToolState::InputStreaming,
                    input: Value::Null,
                    input_text: String::new(),
                    output: None,
                    error_text: None,
                });
            }
        }
        UiMessageChunk::ToolInputDelta {
            tool_call_id,
            input_text_delta,
        } => {
            if message.tool_mut(&tool_call_id).is_none() {
                message.parts.push(UiPart::Tool {
                    tool_call_id: tool_call_id.clone(),
                    tool_name: String::new(),
                    state: ToolState::InputStreaming,
                    input: Value::Null,
                    input_text: String::new(),
                    output: None,
                    error_text: None,
                });
            }
            if let Some(UiPart::Tool {
                input, input_text, ..
            }) = message.tool_mut(&tool_call_id)
            {
                input_text.push_str(&input_text_delta);
                // Partial JSON stays unparsed until it closes.
                if let Ok(parsed) = serde_json::from_str::<Value>(input_text) {
                    *input = parsed;
                }
            }
        }
        UiMessageChunk::ToolInputAvailable {
            tool_call_id,
            tool_name,
            input,
        } => match message.tool_mut(&tool_call_id) {
            Some(UiPart::Tool {
                tool_name: name,
                state,
                input: current,
                input_text,
                ..
            }) => {
                *name = tool_name;
                *state = ToolState::InputAvailable;
                *current = input;
                input_text.clear();
            }
            _ => message
                .parts
                .push(UiPart::tool_call(tool_call_id, tool_name, input)),
        },
        UiMessageChunk::ToolOutputAvailable {
            tool_call_id,
            output,
        } => {
            if let Some(UiPart::Tool {
                state, output: current, ..
            }) = message.tool_mut(&tool_call_id)
            {
                *state = ToolState::OutputAvailable;
                *current = Some(output);
            }
        }
        UiMessageChunk::ToolOutputError {
            tool_call_id,
            error_text,
        } => {
            if let Some(UiPart::Tool {
                state,
                error_text: current,
                ..
            }) = message.tool_mut(&tool_call_id)
            {
                *state = ToolState::OutputError;
                *current = Some(error_text);
            }
        }
        UiMessageChunk::SourceUrl {
            source_id,
            url,
            title,
        } => message.parts.push(UiPart::Source {
            source_id,
            url: Some(url),
            title,
        }),
        UiMessageChunk::SourceDocument {
            source_id, title, ..
        } => message.parts.push(UiPart::Source {
            source_id,
            url: None,
            title: Some(title),
        }),
        UiMessageChunk::File { url, media_type } => {
            message.parts.push(UiPart::File { media_type, url })
        }
        UiMessageChunk::Data { name, id, data } => {
            let existing = id.as_ref().and_then(|id| {
                message.parts.iter().position(|p| {
                    matches!(p, UiPart::Data { name: n, id: Some(i), .. } if *n == name && i == id)
                })
            });
            match existing {
                Some(i) => message.parts[i] = UiPart::Data { name, id, data },
                None => message.parts.push(UiPart::Data { name, id, data }),
            }
        }
        _ => {}
    }
}

fn fold_text_part(message: &mut UiMessage, part: TextStreamPart) {
    match part {
        TextStreamPart::TextDelta { text, .. } => message.push_text(&text),
        TextStreamPart::ReasoningDelta { text, .. } => message.push_reasoning(&text),
        TextStreamPart::ToolCall {
            tool_call_id,
            tool_name,
            input,
        } => match message.tool_mut(&tool_call_id) {
            Some(UiPart::Tool { input: current, .. }) => *current = input,
            _ => message
                .parts
                .push(UiPart::tool_call(tool_call_id, tool_name, input)),
        },
        TextStreamPart::ToolResult {
            tool_call_id,
            tool_name,
            output,
            is_error,
        } => {
            if message.tool_mut(&tool_call_id).is_none() {
                message
                    .parts
                    .push(UiPart::tool_call(tool_call_id.clone(), tool_name, Value::Null));
            }
            attach_result(message, &tool_call_id, output, is_error);
        }
        TextStreamPart::Source { id, url, title } => message.parts.push(UiPart::Source {
            source_id: id,
            url,
            title,
        }),
        TextStreamPart::File { file } => {
            if let Some(base64) = file.base64 {
                message.parts.push(UiPart::File {
                    url: format!("data:{};base64,{}", file.media_type, base64),
                    media_type: file.media_type,
                });
            }
        }
        _ => {}
    }
}

/// Move a tool part to its output state.
pub(crate) fn attach_result(message: &mut UiMessage, tool_call_id: &str, result: Value, is_error: bool) {
    if let Some(UiPart::Tool {
        state,
        output,
        error_text,
        ..
    }) = message.tool_mut(tool_call_id)
    {
        if is_error {
            *state = ToolState::OutputError;
            *error_text = Some(match &result {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        } else {
            *state = ToolState::OutputAvailable;
        }
        *output = Some(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strand_types::{MessageRole, OrderKey, UI_MESSAGE_CHUNK_FORMAT};

    use crate::ui::{UiSource, UiStatus};

    fn blank() -> UiMessage {
        UiMessage::new(
            "s1",
            "t1",
            OrderKey::new(0, 1),
            MessageRole::Assistant,
            UiStatus::Streaming,
            UiSource::Stream,
        )
    }

    fn stream(format: Option<&str>) -> StreamMessage {
        StreamMessage::new("t1", OrderKey::new(0, 1), format.map(str::to_string))
    }

    #[test]
    fn test_reducer_choice_follows_tag() {
        assert!(matches!(
            Reducer::for_stream(&stream(Some(UI_MESSAGE_CHUNK_FORMAT))),
            Reducer::UiChunks(_)
        ));
        assert!(matches!(Reducer::for_stream(&stream(None)), Reducer::TextParts));
        assert!(Reducer::for_stream(&stream(Some("AudioFrames"))).is_stalled());
    }

    #[test]
    fn test_interleaved_text_ids_keep_their_parts() {
        let mut reducer = Reducer::UiChunks(ChunkState::default());
        let mut msg = blank();

        for fragment in [
            json!({"type": "text-delta", "id": "a", "delta": "one "}),
            json!({"type": "reasoning-delta", "id": "r", "delta": "thinking"}),
            json!({"type": "text-delta", "id": "a", "delta": "two"}),
            json!({"type": "text-delta", "id": "b", "delta": "three"}),
        ] {
            reducer.fold(&mut msg, &fragment);
        }

        assert_eq!(msg.parts.len(), 3);
        assert_eq!(msg.parts[0], UiPart::Text { text: "one two".to_string() });
        assert_eq!(msg.text, "one twothree");
    }

    #[test]
    fn test_streamed_tool_input_parses_once_complete() {
        let mut reducer = Reducer::UiChunks(ChunkState::default());
        let mut msg = blank();

        reducer.fold(
            &mut msg,
            &json!({"type": "tool-input-start", "toolCallId": "c1", "toolName": "weather"}),
        );
        reducer.fold(
            &mut msg,
            &json!({"type": "tool-input-delta", "toolCallId": "c1", "inputTextDelta": "{\"city\":"}),
        );
        match &msg.parts[0] {
            UiPart::Tool { input, state, .. } => {
                assert_eq!(*input, Value::Null);
                assert_eq!(*state, ToolState::InputStreaming);
            }
            other => panic!("Expected tool part, got {:?}", other),
        }

        reducer.fold(
            &mut msg,
            &json!({"type": "tool-input-delta", "toolCallId": "c1", "inputTextDelta": "\"Oslo\"}"}),
        );
        match &msg.parts[0] {
            UiPart::Tool { input, .. } => assert_eq!(input["city"], "Oslo"),
            other => panic!("Expected tool part, got {:?}", other),
        }
    }

    #[test]
    fn test_data_chunks_replace_by_id() {
        let mut reducer = Reducer::UiChunks(ChunkState::default());
        let mut msg = blank();

        reducer.fold(&mut msg, &json!({"type": "data-weather", "id": "w", "data": {"temp": 1}}));
        reducer.fold(&mut msg, &json!({"type": "data-weather", "id": "w", "data": {"temp": 2}}));
        reducer.fold(&mut msg, &json!({"type": "data-weather", "data": {"temp": 3}}));

        assert_eq!(msg.parts.len(), 2);
        match &msg.parts[0] {
            UiPart::Data { data, .. } => assert_eq!(data["temp"], 2),
            other => panic!("Expected data part, got {:?}", other),
        }
    }

    #[test]
    fn test_text_parts_tool_error() {
        let mut reducer = Reducer::TextParts;
        let mut msg = blank();

        reducer.fold(
            &mut msg,
            &json!({"type": "tool-call", "toolCallId": "c1", "toolName": "search", "input": {"q": "x"}}),
        );
        reducer.fold(
            &mut msg,
            &json!({"type": "tool-result", "toolCallId": "c1", "toolName": "search", "output": "timeout", "isError": true}),
        );

        match &msg.parts[0] {
            UiPart::Tool {
                state, error_text, ..
            } => {
                assert_eq!(*state, ToolState::OutputError);
                assert_eq!(error_text.as_deref(), Some("timeout"));
            }
            other => panic!("Expected tool part, got {:?}", other),
        }
    }

    #[test]
    fn test_stalled_ignores_everything() {
        let mut reducer = Reducer::Stalled {
            format: "AudioFrames".to_string(),
        };
        let mut msg = blank();
        reducer.fold(&mut msg, &json!({"type": "text-delta", "text": "hi"}));
        assert!(msg.parts.is_empty());
    }
}
