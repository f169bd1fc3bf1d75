use strand_types::MessageRole;

use crate::ui::{UiMessage, UiSource};

/// Merge committed messages with live stream messages into one timeline,
/// oldest first.
///
/// A stream disappears once a terminal committed message of its order reaches
/// its step. A pending committed assistant message stays hidden while a
/// stream of the same order is still shown.
pub fn merge_timeline(committed: Vec<UiMessage>, streaming: Vec<UiMessage>) -> Vec<UiMessage> {
    let streaming: Vec<UiMessage> = streaming
        .into_iter()
        .filter(|stream| {
            !committed.iter().any(|c| {
                c.order == stream.order && c.is_terminal() && c.step_order >= stream.step_order
            })
        })
        .collect();

    let mut timeline: Vec<UiMessage> = committed
        .into_iter()
        .filter(|c| {
            c.source != UiSource::Committed
                || c.is_terminal()
                || c.role == MessageRole::User
                || !streaming.iter().any(|s| s.order == c.order)
        })
        .collect();
    timeline.extend(streaming);

    timeline.sort_by_key(|m| (m.order, m.step_order));
    timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_types::OrderKey;

    use crate::ui::UiStatus;

    fn message(id: &str, key: OrderKey, role: MessageRole, status: UiStatus, source: UiSource) -> UiMessage {
        UiMessage::new(id, "t1", key, role, status, source)
    }

    #[test]
    fn test_stream_hidden_once_committed() {
        let committed = vec![
            message("u", OrderKey::new(0, 0), MessageRole::User, UiStatus::Success, UiSource::Committed),
            message("a", OrderKey::new(0, 1), MessageRole::Assistant, UiStatus::Success, UiSource::Committed),
        ];
        let streaming = vec![message(
            "s",
            OrderKey::new(0, 1),
            MessageRole::Assistant,
            UiStatus::Success,
            UiSource::Stream,
        )];

        let timeline = merge_timeline(committed, streaming);
        let ids: Vec<&str> = timeline.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["u", "a"]);
    }

    #[test]
    fn test_pending_placeholder_hidden_behind_stream() {
        let committed = vec![
            message("u", OrderKey::new(1, 0), MessageRole::User, UiStatus::Success, UiSource::Committed),
            message("p", OrderKey::new(1, 1), MessageRole::Assistant, UiStatus::Pending, UiSource::Committed),
        ];
        let streaming = vec![message(
            "s",
            OrderKey::new(1, 1),
            MessageRole::Assistant,
            UiStatus::Streaming,
            UiSource::Stream,
        )];

        let timeline = merge_timeline(committed, streaming);
        let ids: Vec<&str> = timeline.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["u", "s"]);
    }

    #[test]
    fn test_later_step_stream_stays_visible() {
        let committed = vec![message(
            "a",
            OrderKey::new(0, 1),
            MessageRole::Assistant,
            UiStatus::Success,
            UiSource::Committed,
        )];
        let streaming = vec![message(
            "s",
            OrderKey::new(0, 2),
            MessageRole::Assistant,
            UiStatus::Streaming,
            UiSource::Stream,
        )];

        let timeline = merge_timeline(committed, streaming);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[1].id, "s");
    }
}
