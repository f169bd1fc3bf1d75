use std::sync::Arc;

use async_trait::async_trait;
use strand_persist::{
    CreateThreadArgs, Embeddings, FinalizeMessage, LedgerStore, LedgerWrite, ListMessagesArgs,
    MemoryLedgerStore, MemoryVectorStore, MessageInput, MessageLedger, MessageQuery, PersistError,
    SaveMessageArgs, SaveMessagesOptions,
};
use strand_types::{
    Content, ContentPart, LedgerConfig, Message, MessageDoc, MessageStatus, OrderKey, PaginationOpts,
    Thread, ThreadPatch, ThreadStatus,
};

fn ledger() -> MessageLedger {
    MessageLedger::new(
        Arc::new(MemoryLedgerStore::new()),
        Arc::new(MemoryVectorStore::new()),
        LedgerConfig::default(),
    )
}

async fn thread(ledger: &MessageLedger) -> String {
    ledger
        .create_thread(CreateThreadArgs {
            user_id: Some("user_1".to_string()),
            ..Default::default()
        })
        .await
        .unwrap()
        .id
}

fn inputs(messages: Vec<Message>) -> Vec<MessageInput> {
    messages.into_iter().map(MessageInput::from).collect()
}

fn after_prompt(prompt_id: &str) -> SaveMessagesOptions {
    SaveMessagesOptions {
        prompt_message_id: Some(prompt_id.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_first_message_opens_order_zero() {
    let ledger = ledger();
    let thread_id = thread(&ledger).await;

    let saved = ledger
        .save_message(&thread_id, SaveMessageArgs::prompt("Hello"))
        .await
        .unwrap();

    assert_eq!(saved.message.key(), OrderKey::new(0, 0));
    assert_eq!(saved.message.status, MessageStatus::Success);
    assert_eq!(saved.message.text.as_deref(), Some("Hello"));
}

#[tokio::test]
async fn test_batch_without_prompt_opens_orders_for_user_messages() {
    let ledger = ledger();
    let thread_id = thread(&ledger).await;

    let saved = ledger
        .save_messages(
            &thread_id,
            inputs(vec![
                Message::user("q1"),
                Message::assistant("a1"),
                Message::user("q2"),
                Message::assistant("a2"),
                Message::tool("t2"),
            ]),
            SaveMessagesOptions::default(),
        )
        .await
        .unwrap();

    let keys: Vec<OrderKey> = saved.messages.iter().map(MessageDoc::key).collect();
    assert_eq!(
        keys,
        vec![
            OrderKey::new(0, 0),
            OrderKey::new(0, 1),
            OrderKey::new(1, 0),
            OrderKey::new(1, 1),
            OrderKey::new(1, 2),
        ]
    );
    assert_eq!(saved.last_message_id, saved.messages[4].id);

    let next = ledger
        .save_message(&thread_id, SaveMessageArgs::prompt("q3"))
        .await
        .unwrap();
    assert_eq!(next.message.key(), OrderKey::new(2, 0));
}

#[tokio::test]
async fn test_steps_follow_the_prompt() {
    let ledger = ledger();
    let thread_id = thread(&ledger).await;

    // user at 0.0, five assistant steps at 0.1 ..= 0.5
    let setup = ledger
        .save_messages(
            &thread_id,
            inputs(vec![
                Message::user("go"),
                Message::assistant("s1"),
                Message::assistant("s2"),
                Message::assistant("s3"),
                Message::assistant("s4"),
                Message::assistant("s5"),
            ]),
            SaveMessagesOptions::default(),
        )
        .await
        .unwrap();
    let prompt = &setup.messages[5];
    assert_eq!(prompt.key(), OrderKey::new(0, 5));

    let saved = ledger
        .save_messages(
            &thread_id,
            inputs(vec![
                Message::assistant("a"),
                Message::tool("b"),
                Message::assistant("c"),
            ]),
            after_prompt(&prompt.id),
        )
        .await
        .unwrap();

    let steps: Vec<u64> = saved.messages.iter().map(|m| m.step_order).collect();
    assert_eq!(steps, vec![6, 7, 8]);
    assert!(saved.messages.iter().all(|m| m.order == 0));
    assert!(saved
        .messages
        .iter()
        .all(|m| m.prompt_message_id.as_deref() == Some(prompt.id.as_str())));
}

#[tokio::test]
async fn test_steps_skip_past_existing_steps_of_the_order() {
    let ledger = ledger();
    let thread_id = thread(&ledger).await;

    let prompt = ledger
        .save_message(&thread_id, SaveMessageArgs::prompt("go"))
        .await
        .unwrap()
        .message;

    let first = ledger
        .save_messages(&thread_id, inputs(vec![Message::assistant("one")]), after_prompt(&prompt.id))
        .await
        .unwrap();
    let second = ledger
        .save_messages(&thread_id, inputs(vec![Message::assistant("two")]), after_prompt(&prompt.id))
        .await
        .unwrap();

    assert_eq!(first.messages[0].key(), OrderKey::new(0, 1));
    assert_eq!(second.messages[0].key(), OrderKey::new(0, 2));
}

#[tokio::test]
async fn test_fail_pending_steps() {
    let ledger = ledger();
    let thread_id = thread(&ledger).await;

    let prompt = ledger
        .save_message(&thread_id, SaveMessageArgs::prompt("go"))
        .await
        .unwrap()
        .message;

    let abandoned = ledger
        .save_messages(
            &thread_id,
            inputs(vec![Message::assistant("partial")]),
            SaveMessagesOptions {
                pending: true,
                ..after_prompt(&prompt.id)
            },
        )
        .await
        .unwrap()
        .messages
        .remove(0);
    assert_eq!(abandoned.status, MessageStatus::Pending);

    let retry = ledger
        .save_messages(
            &thread_id,
            inputs(vec![Message::assistant("complete")]),
            SaveMessagesOptions {
                fail_pending_steps: true,
                ..after_prompt(&prompt.id)
            },
        )
        .await
        .unwrap();

    assert_eq!(retry.messages[0].key(), OrderKey::new(0, 2));
    assert_eq!(retry.messages[0].status, MessageStatus::Success);

    let abandoned = ledger.get_message(&abandoned.id).await.unwrap();
    assert_eq!(abandoned.status, MessageStatus::Failed);
    assert!(abandoned.error.is_some());

    // the prompt itself is untouched
    let prompt = ledger.get_message(&prompt.id).await.unwrap();
    assert_eq!(prompt.status, MessageStatus::Success);
}

#[tokio::test]
async fn test_concurrent_saves_get_unique_keys() {
    let ledger = Arc::new(ledger());
    let thread_id = thread(&ledger).await;
    let prompt = ledger
        .save_message(&thread_id, SaveMessageArgs::prompt("go"))
        .await
        .unwrap()
        .message;

    let mut handles = Vec::new();
    for i in 0..10 {
        let ledger = ledger.clone();
        let thread_id = thread_id.clone();
        let prompt_id = prompt.id.clone();
        handles.push(tokio::spawn(async move {
            ledger
                .save_messages(
                    &thread_id,
                    inputs(vec![Message::assistant(format!("step {}", i))]),
                    after_prompt(&prompt_id),
                )
                .await
                .unwrap()
                .messages
                .remove(0)
                .key()
        }));
    }

    let mut keys = Vec::new();
    for handle in handles {
        keys.push(handle.await.unwrap());
    }
    keys.sort();

    let expected: Vec<OrderKey> = (1..=10).map(|s| OrderKey::new(0, s)).collect();
    assert_eq!(keys, expected);
}

#[tokio::test]
async fn test_list_messages_pages_newest_first() {
    let ledger = ledger();
    let thread_id = thread(&ledger).await;
    for text in ["a", "b", "c", "d", "e"] {
        ledger
            .save_message(&thread_id, SaveMessageArgs::prompt(text))
            .await
            .unwrap();
    }

    let first = ledger
        .list_messages(&thread_id, ListMessagesArgs::new(2))
        .await
        .unwrap();
    let texts: Vec<_> = first.page.iter().map(|m| m.text.clone().unwrap()).collect();
    assert_eq!(texts, vec!["e", "d"]);
    assert!(!first.is_done);

    let cursor = first.continue_cursor.unwrap();
    assert_eq!(cursor, "3.0");

    let second = ledger
        .list_messages(&thread_id, ListMessagesArgs::new(2).after(cursor))
        .await
        .unwrap();
    let texts: Vec<_> = second.page.iter().map(|m| m.text.clone().unwrap()).collect();
    assert_eq!(texts, vec!["c", "b"]);

    let last = ledger
        .list_messages(&thread_id, ListMessagesArgs::new(2).after(second.continue_cursor.unwrap()))
        .await
        .unwrap();
    assert_eq!(last.page.len(), 1);
    assert!(last.is_done);
    assert!(last.continue_cursor.is_none());

    let ascending = ledger
        .list_messages(&thread_id, ListMessagesArgs::new(10).ascending())
        .await
        .unwrap();
    assert_eq!(ascending.page[0].text.as_deref(), Some("a"));
    assert!(ascending.is_done);
}

#[tokio::test]
async fn test_list_messages_filters() {
    let ledger = ledger();
    let thread_id = thread(&ledger).await;

    let call = Message::assistant(Content::Parts(vec![ContentPart::ToolCall {
        tool_call_id: "c1".to_string(),
        tool_name: "search".to_string(),
        args: serde_json::json!({"q": "rust"}),
    }]));
    ledger
        .save_messages(
            &thread_id,
            inputs(vec![Message::user("find"), call, Message::tool("found"), Message::assistant("done")]),
            SaveMessagesOptions::default(),
        )
        .await
        .unwrap();
    ledger
        .save_messages(
            &thread_id,
            inputs(vec![Message::user("again")]),
            SaveMessagesOptions {
                pending: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let no_tools = ledger
        .list_messages(&thread_id, ListMessagesArgs::new(10).without_tool_messages())
        .await
        .unwrap();
    let texts: Vec<_> = no_tools.page.iter().filter_map(|m| m.text.clone()).collect();
    assert_eq!(texts, vec!["again", "done", "find"]);

    let pending = ledger
        .list_messages(
            &thread_id,
            ListMessagesArgs::new(10).with_statuses(vec![MessageStatus::Pending]),
        )
        .await
        .unwrap();
    assert_eq!(pending.page.len(), 1);
    assert_eq!(pending.page[0].text.as_deref(), Some("again"));
}

#[tokio::test]
async fn test_invalid_cursor_is_rejected() {
    let ledger = ledger();
    let thread_id = thread(&ledger).await;

    let err = ledger
        .list_messages(&thread_id, ListMessagesArgs::new(5).after("not-a-key"))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::InvalidCursor(_)));
}

/// Storage that must never be reached
struct UnreachableStore;

#[async_trait]
impl LedgerStore for UnreachableStore {
    async fn insert_thread(&self, _: Thread) -> strand_persist::Result<()> {
        unreachable!("storage accessed")
    }
    async fn get_thread(&self, _: &str) -> strand_persist::Result<Option<Thread>> {
        unreachable!("storage accessed")
    }
    async fn replace_thread(&self, _: Thread) -> strand_persist::Result<()> {
        unreachable!("storage accessed")
    }
    async fn delete_thread(&self, _: &str) -> strand_persist::Result<bool> {
        unreachable!("storage accessed")
    }
    async fn list_threads(&self, _: &str, _: usize, _: usize) -> strand_persist::Result<Vec<Thread>> {
        unreachable!("storage accessed")
    }
    async fn get_message(&self, _: &str) -> strand_persist::Result<Option<MessageDoc>> {
        unreachable!("storage accessed")
    }
    async fn get_messages(&self, _: &[String]) -> strand_persist::Result<Vec<Option<MessageDoc>>> {
        unreachable!("storage accessed")
    }
    async fn max_key(&self, _: &str, _: Option<u64>) -> strand_persist::Result<Option<OrderKey>> {
        unreachable!("storage accessed")
    }
    async fn messages_at_order(&self, _: &str, _: u64) -> strand_persist::Result<Vec<MessageDoc>> {
        unreachable!("storage accessed")
    }
    async fn scan_messages(&self, _: &MessageQuery) -> strand_persist::Result<Vec<MessageDoc>> {
        unreachable!("storage accessed")
    }
    async fn commit(&self, _: LedgerWrite) -> strand_persist::Result<()> {
        unreachable!("storage accessed")
    }
    async fn delete_messages(&self, _: &[String]) -> strand_persist::Result<usize> {
        unreachable!("storage accessed")
    }
}

#[tokio::test]
async fn test_zero_items_short_circuits_storage() {
    let ledger = MessageLedger::new(
        Arc::new(UnreachableStore),
        Arc::new(MemoryVectorStore::new()),
        LedgerConfig::default(),
    );

    let page = ledger
        .list_messages("any-thread", ListMessagesArgs::new(0))
        .await
        .unwrap();
    assert!(page.page.is_empty());
    assert!(page.is_done);

    let threads = ledger
        .list_threads_by_user("user_1", PaginationOpts::first(0))
        .await
        .unwrap();
    assert!(threads.is_done);
}

#[tokio::test]
async fn test_page_size_is_clamped() {
    let ledger = MessageLedger::new(
        Arc::new(MemoryLedgerStore::new()),
        Arc::new(MemoryVectorStore::new()),
        LedgerConfig::default().with_max_page_size(3),
    );
    let thread_id = thread(&ledger).await;
    for i in 0..5 {
        ledger
            .save_message(&thread_id, SaveMessageArgs::prompt(format!("m{}", i)))
            .await
            .unwrap();
    }

    let page = ledger
        .list_messages(&thread_id, ListMessagesArgs::new(100))
        .await
        .unwrap();
    assert_eq!(page.page.len(), 3);
    assert!(!page.is_done);
}

#[tokio::test]
async fn test_embedding_validation_writes_nothing() {
    let vectors = Arc::new(MemoryVectorStore::new());
    let ledger = MessageLedger::new(
        Arc::new(MemoryLedgerStore::new()),
        vectors.clone(),
        LedgerConfig::default(),
    );
    let thread_id = thread(&ledger).await;

    let err = ledger
        .save_messages(
            &thread_id,
            inputs(vec![Message::user("a"), Message::assistant("b")]),
            SaveMessagesOptions {
                embeddings: Some(Embeddings {
                    model: "embed-small".to_string(),
                    dimension: 3,
                    vectors: vec![Some(vec![0.1, 0.2, 0.3]), Some(vec![0.1])],
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::Validation(_)));

    let page = ledger
        .list_messages(&thread_id, ListMessagesArgs::new(10))
        .await
        .unwrap();
    assert!(page.page.is_empty());
    assert_eq!(vectors.len().await, 0);
}

#[tokio::test]
async fn test_embeddings_are_linked() {
    let vectors = Arc::new(MemoryVectorStore::new());
    let ledger = MessageLedger::new(
        Arc::new(MemoryLedgerStore::new()),
        vectors.clone(),
        LedgerConfig::default(),
    );
    let thread_id = thread(&ledger).await;

    let saved = ledger
        .save_messages(
            &thread_id,
            inputs(vec![Message::user("a"), Message::assistant("b")]),
            SaveMessagesOptions {
                embeddings: Some(Embeddings {
                    model: "embed-small".to_string(),
                    dimension: 2,
                    vectors: vec![None, Some(vec![0.5, 0.25])],
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(saved.messages[0].embedding_id.is_none());
    let id = saved.messages[1].embedding_id.clone().unwrap();
    let stored = vectors.get(&id).await.unwrap();
    assert_eq!(stored.model, "embed-small");
    assert_eq!(stored.vector, vec![0.5, 0.25]);
}

#[tokio::test]
async fn test_finalize_pending_message() {
    let ledger = ledger();
    let thread_id = thread(&ledger).await;
    let prompt = ledger
        .save_message(&thread_id, SaveMessageArgs::prompt("go"))
        .await
        .unwrap()
        .message;

    let pending = ledger
        .save_messages(
            &thread_id,
            inputs(vec![Message::assistant("")]),
            SaveMessagesOptions {
                pending: true,
                ..after_prompt(&prompt.id)
            },
        )
        .await
        .unwrap()
        .messages
        .remove(0);

    let done = ledger
        .finalize_message(&pending.id, FinalizeMessage::success(Some(Message::assistant("final answer"))))
        .await
        .unwrap();
    assert_eq!(done.status, MessageStatus::Success);
    assert_eq!(done.text.as_deref(), Some("final answer"));

    let stored = ledger.get_message(&pending.id).await.unwrap();
    assert_eq!(stored, done);

    let err = ledger
        .finalize_message(&pending.id, FinalizeMessage::failed("late"))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::Validation(_)));
}

#[tokio::test]
async fn test_finalize_requires_terminal_status() {
    let ledger = ledger();
    let err = ledger
        .finalize_message(
            "whatever",
            FinalizeMessage {
                status: MessageStatus::Pending,
                message: None,
                error: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::Validation(_)));

    let err = ledger
        .finalize_message("missing", FinalizeMessage::failed("x"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_thread_lifecycle() {
    let ledger = ledger();
    let thread_id = thread(&ledger).await;

    let updated = ledger
        .update_thread(
            &thread_id,
            ThreadPatch {
                title: Some("Trip planning".to_string()),
                status: Some(ThreadStatus::Archived),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title.as_deref(), Some("Trip planning"));
    assert_eq!(ledger.get_thread_metadata(&thread_id).await.unwrap(), updated);

    let saved = ledger
        .save_message(&thread_id, SaveMessageArgs::prompt("hi"))
        .await
        .unwrap();

    ledger.delete_thread(&thread_id).await.unwrap();

    assert!(matches!(
        ledger.get_thread_metadata(&thread_id).await,
        Err(PersistError::ThreadNotFound(_))
    ));
    assert_eq!(
        ledger.get_messages_by_ids(&[saved.message_id]).await.unwrap(),
        vec![None]
    );
    assert!(ledger.delete_thread(&thread_id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_save_into_missing_thread() {
    let ledger = ledger();
    let err = ledger
        .save_message("nope", SaveMessageArgs::prompt("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::ThreadNotFound(_)));
}

#[tokio::test]
async fn test_list_threads_by_user() {
    let ledger = ledger();
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(thread(&ledger).await);
    }
    ledger
        .create_thread(CreateThreadArgs {
            user_id: Some("someone_else".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let first = ledger
        .list_threads_by_user("user_1", PaginationOpts::first(2))
        .await
        .unwrap();
    assert_eq!(first.page.len(), 2);
    assert!(!first.is_done);

    let rest = ledger
        .list_threads_by_user("user_1", PaginationOpts::after(2, first.continue_cursor.unwrap()))
        .await
        .unwrap();
    assert_eq!(rest.page.len(), 1);
    assert!(rest.is_done);

    let mut seen: Vec<String> = first.page.iter().chain(rest.page.iter()).map(|t| t.id.clone()).collect();
    seen.sort();
    ids.sort();
    assert_eq!(seen, ids);
}

#[tokio::test]
async fn test_delete_messages() {
    let ledger = ledger();
    let thread_id = thread(&ledger).await;
    let saved = ledger
        .save_messages(
            &thread_id,
            inputs(vec![Message::user("a"), Message::assistant("b")]),
            SaveMessagesOptions::default(),
        )
        .await
        .unwrap();

    let deleted = ledger
        .delete_messages(&[saved.messages[1].id.clone(), "missing".to_string()])
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let page = ledger
        .list_messages(&thread_id, ListMessagesArgs::new(10))
        .await
        .unwrap();
    assert_eq!(page.page.len(), 1);
}

#[tokio::test]
async fn test_store_rejects_key_collisions() {
    let store = MemoryLedgerStore::new();
    let thread = Thread::new(None, None, None);
    store.insert_thread(thread.clone()).await.unwrap();

    let ledger = MessageLedger::new(
        Arc::new(MemoryLedgerStore::new()),
        Arc::new(MemoryVectorStore::new()),
        LedgerConfig::default(),
    );
    let other = ledger.create_thread(CreateThreadArgs::default()).await.unwrap();
    let mut doc = ledger
        .save_message(&other.id, SaveMessageArgs::prompt("x"))
        .await
        .unwrap()
        .message;
    doc.thread_id = thread.id.clone();

    let mut write = LedgerWrite::new(&thread.id);
    write.inserts.push(doc.clone());
    store.commit(write).await.unwrap();

    let mut clash = doc.clone();
    clash.id = "another".to_string();
    let mut write = LedgerWrite::new(&thread.id);
    write.inserts.push(clash);
    let err = store.commit(write).await.unwrap_err();
    assert!(matches!(err, PersistError::Validation(_)));
    assert_eq!(store.max_key(&thread.id, None).await.unwrap(), Some(doc.key()));
}

/// Memory ledger whose commits always fail
#[derive(Default)]
struct DownOnCommitStore {
    inner: MemoryLedgerStore,
}

#[async_trait]
impl LedgerStore for DownOnCommitStore {
    async fn insert_thread(&self, thread: Thread) -> strand_persist::Result<()> {
        self.inner.insert_thread(thread).await
    }
    async fn get_thread(&self, thread_id: &str) -> strand_persist::Result<Option<Thread>> {
        self.inner.get_thread(thread_id).await
    }
    async fn replace_thread(&self, thread: Thread) -> strand_persist::Result<()> {
        self.inner.replace_thread(thread).await
    }
    async fn delete_thread(&self, thread_id: &str) -> strand_persist::Result<bool> {
        self.inner.delete_thread(thread_id).await
    }
    async fn list_threads(&self, user_id: &str, skip: usize, limit: usize) -> strand_persist::Result<Vec<Thread>> {
        self.inner.list_threads(user_id, skip, limit).await
    }
    async fn get_message(&self, message_id: &str) -> strand_persist::Result<Option<MessageDoc>> {
        self.inner.get_message(message_id).await
    }
    async fn get_messages(&self, message_ids: &[String]) -> strand_persist::Result<Vec<Option<MessageDoc>>> {
        self.inner.get_messages(message_ids).await
    }
    async fn max_key(&self, thread_id: &str, order: Option<u64>) -> strand_persist::Result<Option<OrderKey>> {
        self.inner.max_key(thread_id, order).await
    }
    async fn messages_at_order(&self, thread_id: &str, order: u64) -> strand_persist::Result<Vec<MessageDoc>> {
        self.inner.messages_at_order(thread_id, order).await
    }
    async fn scan_messages(&self, query: &MessageQuery) -> strand_persist::Result<Vec<MessageDoc>> {
        self.inner.scan_messages(query).await
    }
    async fn commit(&self, _: LedgerWrite) -> strand_persist::Result<()> {
        Err(PersistError::Connection("down".to_string()))
    }
    async fn delete_messages(&self, message_ids: &[String]) -> strand_persist::Result<usize> {
        self.inner.delete_messages(message_ids).await
    }
}

#[tokio::test]
async fn test_failed_commit_removes_inserted_vectors() {
    let vectors = Arc::new(MemoryVectorStore::new());
    let ledger = MessageLedger::new(
        Arc::new(DownOnCommitStore::default()),
        vectors.clone(),
        LedgerConfig::default(),
    );
    let thread_id = thread(&ledger).await;

    let err = ledger
        .save_messages(
            &thread_id,
            inputs(vec![Message::user("a"), Message::assistant("b")]),
            SaveMessagesOptions {
                embeddings: Some(Embeddings {
                    model: "embed-small".to_string(),
                    dimension: 2,
                    vectors: vec![Some(vec![0.1, 0.2]), None],
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PersistError::Connection(_)));
    assert_eq!(vectors.len().await, 0);
}
