use serde_json::json;
use strand_client::{Phase, StreamReconstructor, ToolState, UiPart, UiStatus};
use strand_persist::{DeltaStore, PersistClient};
use strand_stream::{TextStreamPart, UiMessageChunk};
use strand_types::{
    Cursor, DeltaBatch, DeltaRecord, OrderKey, StreamMessage, StreamStatus, TEXT_STREAM_PART_FORMAT,
    UI_MESSAGE_CHUNK_FORMAT,
};

fn stream(format: Option<&str>) -> StreamMessage {
    StreamMessage::new("thread_1", OrderKey::new(0, 1), format.map(str::to_string))
}

fn record(stream_id: &str, start: u64, end: u64, parts: Vec<serde_json::Value>) -> DeltaRecord {
    DeltaRecord {
        stream_id: stream_id.to_string(),
        start: Cursor(start),
        end: Cursor(end),
        parts,
    }
}

fn batch(stream_id: &str, deltas: Vec<DeltaRecord>, status: StreamStatus) -> DeltaBatch {
    let cursor = deltas.last().map(|d| d.end).unwrap_or_default();
    DeltaBatch {
        stream_id: stream_id.to_string(),
        deltas,
        cursor,
        status,
    }
}

#[tokio::test]
async fn test_hello_reconstructed_from_the_log() {
    let client = PersistClient::in_memory();
    let mut streamer = client
        .start_stream::<TextStreamPart>(stream(Some(TEXT_STREAM_PART_FORMAT)))
        .await
        .unwrap();
    let mut reader = StreamReconstructor::new(streamer.stream().clone());
    assert_eq!(reader.phase(), Phase::Blank);
    assert!(reader.message().parts.is_empty());

    streamer
        .push_many(vec![TextStreamPart::text("Hel"), TextStreamPart::text("lo")])
        .await
        .unwrap();
    streamer.flush().await.unwrap();

    let stream_id = streamer.stream_id().to_string();
    let first = client.deltas().read_deltas(&stream_id, None).await.unwrap();
    assert!(reader.apply(&first));
    assert_eq!(reader.phase(), Phase::Streaming);
    assert_eq!(reader.message().text, "Hello");
    assert_eq!(reader.message().status, UiStatus::Streaming);

    streamer.push(TextStreamPart::text(" world")).await.unwrap();
    streamer.finish().await.unwrap();

    let second = client
        .deltas()
        .read_deltas(&stream_id, Some(reader.cursor()))
        .await
        .unwrap();
    assert!(reader.apply(&second));
    assert_eq!(reader.phase(), Phase::Success);
    assert_eq!(reader.message().text, "Hello world");
    assert_eq!(reader.cursor(), Cursor(3));
}

#[test]
fn test_redelivered_records_are_skipped() {
    let s = stream(Some(TEXT_STREAM_PART_FORMAT));
    let id = s.stream_id.clone();
    let mut reader = StreamReconstructor::new(s);

    let first = record(&id, 0, 2, vec![json!({"type": "text-delta", "text": "ab"})]);
    let second = record(&id, 2, 3, vec![json!({"type": "text-delta", "text": "c"})]);

    reader.apply(&batch(&id, vec![first.clone()], StreamStatus::Streaming));
    assert!(!reader.apply(&batch(&id, vec![first.clone()], StreamStatus::Streaming)));
    reader.apply(&batch(&id, vec![first, second], StreamStatus::Streaming));

    assert_eq!(reader.message().text, "abc");
    assert_eq!(reader.cursor(), Cursor(3));
}

#[test]
fn test_terminal_phase_never_changes() {
    let s = stream(Some(TEXT_STREAM_PART_FORMAT));
    let id = s.stream_id.clone();
    let mut reader = StreamReconstructor::new(s);

    reader.apply(&batch(
        &id,
        vec![record(&id, 0, 1, vec![json!({"type": "text-delta", "text": "done"})])],
        StreamStatus::Finished,
    ));
    assert_eq!(reader.phase(), Phase::Success);

    let late = batch(
        &id,
        vec![record(&id, 1, 2, vec![json!({"type": "text-delta", "text": "!"})])],
        StreamStatus::Aborted,
    );
    assert!(!reader.apply(&late));
    assert_eq!(reader.phase(), Phase::Success);
    assert_eq!(reader.message().text, "done");
}

#[test]
fn test_unknown_format_stalls() {
    let s = stream(Some("AudioFrames"));
    let id = s.stream_id.clone();
    let mut reader = StreamReconstructor::new(s);
    assert!(reader.is_stalled());

    let changed = reader.apply(&batch(
        &id,
        vec![record(&id, 0, 1, vec![json!({"type": "text-delta", "text": "hi"})])],
        StreamStatus::Finished,
    ));

    assert!(!changed);
    assert_eq!(reader.phase(), Phase::Blank);
    assert!(reader.message().parts.is_empty());
    assert_eq!(reader.cursor(), Cursor(1));
}

#[tokio::test]
async fn test_aborted_stream_keeps_partial_content() {
    let client = PersistClient::in_memory();
    let mut streamer = client
        .start_stream::<TextStreamPart>(stream(None))
        .await
        .unwrap();
    let stream_id = streamer.stream_id().to_string();
    let mut reader = StreamReconstructor::new(streamer.stream().clone());

    streamer.push(TextStreamPart::text("partial")).await.unwrap();
    streamer.abort("user cancelled").await.unwrap();

    let descriptor = client
        .deltas()
        .store()
        .get_stream(&stream_id)
        .await
        .unwrap()
        .unwrap();
    reader.update_stream(descriptor);
    let batch = client.deltas().read_deltas(&stream_id, None).await.unwrap();
    reader.apply(&batch);

    assert_eq!(reader.phase(), Phase::Failed);
    assert_eq!(reader.message().status, UiStatus::Failed);
    assert_eq!(reader.message().text, "partial");
    assert_eq!(reader.message().error.as_deref(), Some("user cancelled"));
}

#[tokio::test]
async fn test_ui_chunk_tool_lifecycle() {
    let client = PersistClient::in_memory();
    let mut streamer = client
        .start_stream::<UiMessageChunk>(stream(Some(UI_MESSAGE_CHUNK_FORMAT)))
        .await
        .unwrap();
    let stream_id = streamer.stream_id().to_string();
    let mut reader = StreamReconstructor::new(streamer.stream().clone());

    streamer
        .push_many(vec![
            UiMessageChunk::Start { message_id: None },
            UiMessageChunk::text_delta("t0", "Checking "),
            UiMessageChunk::text_delta("t0", "the weather."),
            UiMessageChunk::ToolInputStart {
                tool_call_id: "call_1".to_string(),
                tool_name: "weather".to_string(),
            },
            UiMessageChunk::ToolInputDelta {
                tool_call_id: "call_1".to_string(),
                input_text_delta: "{\"city\":".to_string(),
            },
            UiMessageChunk::ToolInputDelta {
                tool_call_id: "call_1".to_string(),
                input_text_delta: "\"Oslo\"}".to_string(),
            },
        ])
        .await
        .unwrap();
    streamer.flush().await.unwrap();

    reader.apply(&client.deltas().read_deltas(&stream_id, None).await.unwrap());
    match &reader.message().parts[1] {
        UiPart::Tool { state, input, .. } => {
            assert_eq!(*state, ToolState::InputStreaming);
            assert_eq!(input["city"], "Oslo");
        }
        other => panic!("Expected tool part, got {:?}", other),
    }

    streamer
        .push_many(vec![
            UiMessageChunk::ToolInputAvailable {
                tool_call_id: "call_1".to_string(),
                tool_name: "weather".to_string(),
                input: json!({"city": "Oslo"}),
            },
            UiMessageChunk::ToolOutputAvailable {
                tool_call_id: "call_1".to_string(),
                output: json!({"temp": -3}),
            },
            UiMessageChunk::Finish,
        ])
        .await
        .unwrap();
    streamer.finish().await.unwrap();

    reader.apply(
        &client
            .deltas()
            .read_deltas(&stream_id, Some(reader.cursor()))
            .await
            .unwrap(),
    );

    assert_eq!(reader.phase(), Phase::Success);
    assert_eq!(reader.message().text, "Checking the weather.");
    assert_eq!(reader.message().parts.len(), 2);
    match &reader.message().parts[1] {
        UiPart::Tool { state, output, .. } => {
            assert_eq!(*state, ToolState::OutputAvailable);
            assert_eq!(output.as_ref().unwrap()["temp"], -3);
        }
        other => panic!("Expected tool part, got {:?}", other),
    }
}
