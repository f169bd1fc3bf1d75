use serde_json::json;
use strand_client::{
    merge_timeline, ui_messages_from_docs, OptimisticEcho, StreamReconstructor, ToolState, UiPart,
    UiSource, UiStatus,
};
use strand_persist::{
    CreateThreadArgs, FinalizeMessage, ListMessagesArgs, MessageInput, PersistClient, SaveMessageArgs,
    SaveMessagesOptions,
};
use strand_types::{
    Content, ContentPart, Cursor, DeltaBatch, DeltaRecord, Message, MessageRole, MessageDoc,
    OrderKey, StreamMessage, StreamStatus,
};

async fn thread(client: &PersistClient) -> String {
    client
        .ledger()
        .create_thread(CreateThreadArgs::default())
        .await
        .unwrap()
        .id
}

async fn history(client: &PersistClient, thread_id: &str) -> Vec<MessageDoc> {
    client
        .ledger()
        .list_messages(thread_id, ListMessagesArgs::new(100).ascending())
        .await
        .unwrap()
        .page
}

/// User prompt followed by a tool call, its result and a final answer
async fn tool_turn(client: &PersistClient, thread_id: &str) -> String {
    let prompt = client
        .ledger()
        .save_message(thread_id, SaveMessageArgs::prompt("Weather in Oslo?"))
        .await
        .unwrap();

    let steps = vec![
        Message::assistant(Content::Parts(vec![ContentPart::ToolCall {
            tool_call_id: "call_1".to_string(),
            tool_name: "weather".to_string(),
            args: json!({"city": "Oslo"}),
        }])),
        Message::tool(Content::Parts(vec![ContentPart::ToolResult {
            tool_call_id: "call_1".to_string(),
            tool_name: "weather".to_string(),
            result: json!({"temp": -3}),
            is_error: false,
        }])),
        Message::assistant("It is -3 in Oslo."),
    ];
    client
        .ledger()
        .save_messages(
            thread_id,
            steps.into_iter().map(MessageInput::from).collect(),
            SaveMessagesOptions {
                prompt_message_id: Some(prompt.message_id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    prompt.message_id
}

#[tokio::test]
async fn test_steps_of_one_order_fold_into_one_message() {
    let client = PersistClient::in_memory();
    let thread_id = thread(&client).await;
    let prompt_id = tool_turn(&client, &thread_id).await;

    let messages = ui_messages_from_docs(&history(&client, &thread_id).await);

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, prompt_id);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].text, "Weather in Oslo?");

    let answer = &messages[1];
    assert_eq!(answer.role, MessageRole::Assistant);
    assert_eq!(answer.key, format!("{}-0-1", thread_id));
    assert_eq!(answer.step_order, 3);
    assert_eq!(answer.status, UiStatus::Success);
    assert_eq!(answer.text, "It is -3 in Oslo.");
    assert_eq!(answer.parts.len(), 2);
    match &answer.parts[0] {
        UiPart::Tool {
            state, input, output, ..
        } => {
            assert_eq!(*state, ToolState::OutputAvailable);
            assert_eq!(input["city"], "Oslo");
            assert_eq!(output.as_ref().unwrap()["temp"], -3);
        }
        other => panic!("Expected tool part, got {:?}", other),
    }
}

#[tokio::test]
async fn test_status_follows_the_last_step() {
    let client = PersistClient::in_memory();
    let thread_id = thread(&client).await;
    let prompt = client
        .ledger()
        .save_message(&thread_id, SaveMessageArgs::prompt("hi"))
        .await
        .unwrap();
    let saved = client
        .ledger()
        .save_messages(
            &thread_id,
            vec![
                MessageInput::from(Message::assistant("thinking it over. ")),
                MessageInput::from(Message::assistant("half an answer")),
            ],
            SaveMessagesOptions {
                prompt_message_id: Some(prompt.message_id),
                pending: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let messages = ui_messages_from_docs(&history(&client, &thread_id).await);
    assert_eq!(messages[1].status, UiStatus::Pending);
    assert_eq!(messages[1].text, "thinking it over. half an answer");

    client
        .ledger()
        .finalize_message(&saved.last_message_id, FinalizeMessage::failed("rate limited"))
        .await
        .unwrap();

    let messages = ui_messages_from_docs(&history(&client, &thread_id).await);
    assert_eq!(messages[1].status, UiStatus::Failed);
    assert_eq!(messages[1].error.as_deref(), Some("rate limited"));
    assert_eq!(messages[1].text, "thinking it over. half an answer");
}

#[tokio::test]
async fn test_echo_replaced_by_ledger_message() {
    let client = PersistClient::in_memory();
    let thread_id = thread(&client).await;
    tool_turn(&client, &thread_id).await;

    let mut page = ui_messages_from_docs(&history(&client, &thread_id).await);
    page.reverse();

    let mut echo = OptimisticEcho::new();
    let local = echo.send(&mut page, &thread_id, "And tomorrow?");
    assert_eq!(local.order, 1);
    assert_eq!(local.step_order, 0);
    assert_eq!(local.status, UiStatus::Pending);
    assert_eq!(local.source, UiSource::Optimistic);
    assert_eq!(page[0].id, local.id);
    assert!(echo.is_pending(&local.id));

    // Nothing for order 1 yet.
    assert_eq!(echo.reconcile(&mut page, &history(&client, &thread_id).await), 0);

    let saved = client
        .ledger()
        .save_message(&thread_id, SaveMessageArgs::prompt("And tomorrow?"))
        .await
        .unwrap();
    assert_eq!(saved.message.order, 1);

    assert_eq!(echo.reconcile(&mut page, &history(&client, &thread_id).await), 1);
    assert_eq!(page.len(), 3);
    assert_eq!(page[0].id, saved.message_id);
    assert_eq!(page[0].source, UiSource::Committed);
    assert!(echo.is_empty());
}

#[tokio::test]
async fn test_echo_dropped_when_ledger_message_already_shown() {
    let client = PersistClient::in_memory();
    let thread_id = thread(&client).await;

    let mut page = Vec::new();
    let mut echo = OptimisticEcho::new();
    let local = echo.send(&mut page, &thread_id, "hello");
    assert_eq!(local.order, 0);

    let saved = client
        .ledger()
        .save_message(&thread_id, SaveMessageArgs::prompt("hello"))
        .await
        .unwrap();
    let docs = history(&client, &thread_id).await;
    page.extend(ui_messages_from_docs(&docs));

    assert_eq!(echo.reconcile(&mut page, &docs), 1);
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, saved.message_id);
}

#[tokio::test]
async fn test_echo_replaced_by_prompt_not_by_answer() {
    let client = PersistClient::in_memory();
    let thread_id = thread(&client).await;

    let mut page = Vec::new();
    let mut echo = OptimisticEcho::new();
    echo.send(&mut page, &thread_id, "hello");

    let saved = client
        .ledger()
        .save_messages(
            &thread_id,
            vec![
                MessageInput::from(Message::user("hello")),
                MessageInput::from(Message::assistant("hi there")),
            ],
            SaveMessagesOptions::default(),
        )
        .await
        .unwrap();

    // newest first: the answer comes before the prompt
    let docs = client
        .ledger()
        .list_messages(&thread_id, ListMessagesArgs::new(10))
        .await
        .unwrap()
        .page;
    assert_eq!(docs[0].role(), MessageRole::Assistant);

    assert_eq!(echo.reconcile(&mut page, &docs), 1);
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, saved.messages[0].id);
    assert_eq!(page[0].role, MessageRole::User);
    assert_eq!(page[0].text, "hello");
    assert_eq!(page[0].source, UiSource::Committed);
}

#[test]
fn test_discard_removes_only_the_local_entry() {
    let mut page = Vec::new();
    let mut echo = OptimisticEcho::new();
    let first = echo.send(&mut page, "thread_1", "one");
    let second = echo.send(&mut page, "thread_1", "two");
    assert_eq!(second.order, 1);

    assert!(echo.discard(&mut page, &first.id));
    assert!(!echo.discard(&mut page, &first.id));
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, second.id);
}

#[test]
fn test_echo_ignores_stream_entries_when_predicting_order() {
    let stream = StreamMessage::new("thread_1", OrderKey::new(4, 1), None);
    let mut page = vec![StreamReconstructor::new(stream).message().clone()];

    let mut echo = OptimisticEcho::new();
    let local = echo.send(&mut page, "thread_1", "next");
    assert_eq!(local.order, 0);
}

#[tokio::test]
async fn test_timeline_swaps_stream_for_committed_answer() {
    let client = PersistClient::in_memory();
    let thread_id = thread(&client).await;
    let prompt = client
        .ledger()
        .save_message(&thread_id, SaveMessageArgs::prompt("hi"))
        .await
        .unwrap();

    let stream = StreamMessage::new(thread_id.as_str(), OrderKey::new(0, 1), None);
    let stream_id = stream.stream_id.clone();
    let mut reader = StreamReconstructor::new(stream);
    reader.apply(&DeltaBatch {
        stream_id: stream_id.clone(),
        deltas: vec![DeltaRecord {
            stream_id,
            start: Cursor(0),
            end: Cursor(1),
            parts: vec![json!({"type": "text-delta", "text": "Hey"})],
        }],
        cursor: Cursor(1),
        status: StreamStatus::Finished,
    });

    let committed = ui_messages_from_docs(&history(&client, &thread_id).await);
    let timeline = merge_timeline(committed, vec![reader.message().clone()]);
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[1].source, UiSource::Stream);

    client
        .ledger()
        .save_messages(
            &thread_id,
            vec![MessageInput::from(Message::assistant("Hey"))],
            SaveMessagesOptions {
                prompt_message_id: Some(prompt.message_id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let committed = ui_messages_from_docs(&history(&client, &thread_id).await);
    let timeline = merge_timeline(committed, vec![reader.message().clone()]);
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[1].source, UiSource::Committed);
    assert_eq!(timeline[1].text, "Hey");
}
