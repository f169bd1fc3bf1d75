//! Committed ledger messages as display messages

use strand_types::{ContentPart, MessageDoc, MessageRole};

use crate::reducer::attach_result;
use crate::ui::{UiMessage, UiPart, UiSource, UiStatus};

/// Group ledger docs into display messages, oldest first.
///
/// User and system docs stand alone. Consecutive assistant and tool steps of
/// one order fold into a single assistant message whose status is that of
/// its last step; tool results land on the tool call they answer.
pub fn ui_messages_from_docs(docs: &[MessageDoc]) -> Vec<UiMessage> {
    let mut sorted: Vec<&MessageDoc> = docs.iter().collect();
    sorted.sort_by_key(|d| d.key());

    let mut out: Vec<UiMessage> = Vec::new();
    for doc in sorted {
        let role = doc.role();
        let standalone = matches!(role, MessageRole::User | MessageRole::System);

        let continues = !standalone
            && out.last().is_some_and(|last| {
                last.role == MessageRole::Assistant
                    && last.source == UiSource::Committed
                    && last.order == doc.order
            });

        if !continues {
            let mut message = UiMessage::new(
                doc.id.clone(),
                doc.thread_id.clone(),
                doc.key(),
                if standalone { role } else { MessageRole::Assistant },
                UiStatus::from(doc.status),
                UiSource::Committed,
            );
            message.created_at = doc.created_at;
            out.push(message);
        }

        if let Some(message) = out.last_mut() {
            fold_doc(message, doc);
        }
    }
    out
}

fn fold_doc(message: &mut UiMessage, doc: &MessageDoc) {
    for part in doc.message.content.parts() {
        match part {
            ContentPart::Text { text } => message.push_text(&text),
            ContentPart::Reasoning { text } => message.push_reasoning(&text),
            ContentPart::ToolCall {
                tool_call_id,
                tool_name,
                args,
            } => match message.tool_mut(&tool_call_id) {
                Some(UiPart::Tool { input, .. }) => *input = args,
                _ => message
                    .parts
                    .push(UiPart::tool_call(tool_call_id, tool_name, args)),
            },
            ContentPart::ToolResult {
                tool_call_id,
                tool_name,
                result,
                is_error,
            } => {
                if message.tool_mut(&tool_call_id).is_none() {
                    message.parts.push(UiPart::tool_call(
                        tool_call_id.clone(),
                        tool_name,
                        serde_json::Value::Null,
                    ));
                }
                attach_result(message, &tool_call_id, result, is_error);
            }
            ContentPart::Source {
                source_id,
                url,
                title,
            } => message.parts.push(UiPart::Source {
                source_id,
                url,
                title,
            }),
            ContentPart::File {
                media_type, data, ..
            } => {
                if let Some(data) = data {
                    let url = if data.contains(':') {
                        data
                    } else {
                        format!("data:{};base64,{}", media_type, data)
                    };
                    message.parts.push(UiPart::File { media_type, url });
                }
            }
        }
    }

    message.step_order = message.step_order.max(doc.step_order);
    message.status = UiStatus::from(doc.status);
    message.error = doc.error.clone();
    if message.agent_name.is_none() {
        message.agent_name = doc.agent_name.clone();
    }
}
