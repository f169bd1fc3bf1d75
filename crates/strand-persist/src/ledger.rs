//! Message ledger
//!
//! Durable, ordered history of a thread. Every message sits at a unique
//! [`OrderKey`]; a prompt opens an order and the steps generated in response
//! to it follow at increasing step orders within it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use strand_types::{
    LedgerConfig, MessageDoc, MessageRole, MessageStatus, OrderKey, Page, PaginationOpts, Thread,
    ThreadPatch,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{PersistError, Result};
use crate::models::{
    CreateThreadArgs, FinalizeMessage, ListMessagesArgs, MessageInput, SaveMessageArgs,
    SaveMessageResult, SaveMessagesOptions, SaveMessagesResult,
};
use crate::store::{LedgerStore, LedgerWrite, MessagePatch, MessageQuery};
use crate::vector::VectorStore;

const SUPERSEDED_STEP_ERROR: &str = "Step was superseded before it completed";

pub struct MessageLedger {
    store: Arc<dyn LedgerStore>,
    vectors: Arc<dyn VectorStore>,
    config: LedgerConfig,
    /// Serializes key assignment per thread
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MessageLedger {
    pub fn new(store: Arc<dyn LedgerStore>, vectors: Arc<dyn VectorStore>, config: LedgerConfig) -> Self {
        Self {
            store,
            vectors,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(thread_id.to_string()).or_default().clone()
    }

    // ---- threads ----

    pub async fn create_thread(&self, args: CreateThreadArgs) -> Result<Thread> {
        let thread = Thread::new(args.user_id, args.title, args.summary);
        self.store.insert_thread(thread.clone()).await?;
        info!(thread_id = %thread.id, "created thread");
        Ok(thread)
    }

    pub async fn get_thread_metadata(&self, thread_id: &str) -> Result<Thread> {
        self.store
            .get_thread(thread_id)
            .await?
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))
    }

    pub async fn update_thread(&self, thread_id: &str, patch: ThreadPatch) -> Result<Thread> {
        let mut thread = self.get_thread_metadata(thread_id).await?;
        thread.apply(patch);
        self.store.replace_thread(thread.clone()).await?;
        Ok(thread)
    }

    /// A user's threads, newest first. The continue cursor is an offset.
    pub async fn list_threads_by_user(&self, user_id: &str, pagination: PaginationOpts) -> Result<Page<Thread>> {
        if pagination.num_items == 0 {
            return Ok(Page::empty());
        }

        let skip = match pagination.cursor.as_deref() {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| PersistError::InvalidCursor(cursor.to_string()))?,
            None => 0,
        };
        let limit = pagination.num_items.min(self.config.max_page_size);

        let mut threads = self.store.list_threads(user_id, skip, limit + 1).await?;
        let is_done = threads.len() <= limit;
        threads.truncate(limit);

        Ok(Page {
            continue_cursor: (!is_done).then(|| (skip + threads.len()).to_string()),
            page: threads,
            is_done,
        })
    }

    /// Delete a thread with all of its messages.
    pub async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let lock = self.thread_lock(thread_id).await;
        let _guard = lock.lock().await;

        if !self.store.delete_thread(thread_id).await? {
            return Err(PersistError::ThreadNotFound(thread_id.to_string()));
        }
        self.locks.lock().await.remove(thread_id);

        info!(thread_id = %thread_id, "deleted thread");
        Ok(())
    }

    // ---- reads ----

    pub async fn list_messages(&self, thread_id: &str, args: ListMessagesArgs) -> Result<Page<MessageDoc>> {
        if args.pagination.num_items == 0 {
            return Ok(Page::empty());
        }

        let after = args
            .pagination
            .cursor
            .as_deref()
            .map(|c| c.parse::<OrderKey>().map_err(PersistError::InvalidCursor))
            .transpose()?;
        let limit = args.pagination.num_items.min(self.config.max_page_size);

        let query = MessageQuery {
            thread_id: thread_id.to_string(),
            statuses: args.statuses,
            exclude_tool: args.exclude_tool_messages,
            order: args.order,
            after,
            limit: limit + 1,
        };
        let mut docs = self.store.scan_messages(&query).await?;
        let is_done = docs.len() <= limit;
        docs.truncate(limit);

        debug!(thread_id = %thread_id, count = docs.len(), is_done, "listed messages");

        Ok(Page {
            continue_cursor: if is_done {
                None
            } else {
                docs.last().map(|d| d.key().to_string())
            },
            page: docs,
            is_done,
        })
    }

    pub async fn get_messages_by_ids(&self, message_ids: &[String]) -> Result<Vec<Option<MessageDoc>>> {
        self.store.get_messages(message_ids).await
    }

    pub async fn get_message(&self, message_id: &str) -> Result<MessageDoc> {
        self.store
            .get_message(message_id)
            .await?
            .ok_or_else(|| PersistError::MessageNotFound(message_id.to_string()))
    }

    // ---- writes ----

    pub async fn save_message(&self, thread_id: &str, args: SaveMessageArgs) -> Result<SaveMessageResult> {
        let (input, options) = args.into_batch();
        let mut saved = self.save_messages(thread_id, vec![input], options).await?;

        let message = saved
            .messages
            .pop()
            .ok_or_else(|| PersistError::Internal("save produced no message".to_string()))?;
        Ok(SaveMessageResult {
            message_id: message.id.clone(),
            message,
        })
    }

    /// Append a batch of messages in one commit.
    ///
    /// With a prompt, inputs take consecutive steps above every existing step
    /// of the prompt's order. Without one, the batch opens a fresh order and
    /// each later user input opens another.
    pub async fn save_messages(
        &self,
        thread_id: &str,
        inputs: Vec<MessageInput>,
        options: SaveMessagesOptions,
    ) -> Result<SaveMessagesResult> {
        if inputs.is_empty() {
            return Err(PersistError::Validation("no messages to save".to_string()));
        }
        if let Some(embeddings) = &options.embeddings {
            embeddings.validate(inputs.len())?;
        }

        let lock = self.thread_lock(thread_id).await;
        let _guard = lock.lock().await;

        self.get_thread_metadata(thread_id).await?;

        let prompt = match options.prompt_message_id.as_deref() {
            Some(id) => {
                let prompt = self.get_message(id).await?;
                if prompt.thread_id != thread_id {
                    return Err(PersistError::Validation(format!(
                        "prompt {} belongs to thread {}",
                        id, prompt.thread_id
                    )));
                }
                Some(prompt)
            }
            None => None,
        };

        let mut write = LedgerWrite::new(thread_id);

        let keys = match &prompt {
            Some(prompt) => {
                let existing = self.store.max_key(thread_id, Some(prompt.order)).await?;
                let base = existing
                    .map(|k| k.step_order)
                    .unwrap_or(0)
                    .max(prompt.step_order);

                if options.fail_pending_steps {
                    let stale = self.store.messages_at_order(thread_id, prompt.order).await?;
                    write.patches.extend(
                        stale
                            .iter()
                            .filter(|d| d.status == MessageStatus::Pending)
                            .filter(|d| d.step_order > prompt.step_order && d.id != prompt.id)
                            .map(|d| MessagePatch::fail_pending(&d.id, SUPERSEDED_STEP_ERROR)),
                    );
                }

                let mut key = OrderKey::new(prompt.order, base);
                inputs
                    .iter()
                    .map(|_| {
                        key = key.next_step();
                        key
                    })
                    .collect::<Vec<_>>()
            }
            None => {
                let latest = self.store.max_key(thread_id, None).await?;

                if options.fail_pending_steps {
                    if let Some(latest) = latest {
                        let stale = self.store.messages_at_order(thread_id, latest.order).await?;
                        write.patches.extend(
                            stale
                                .iter()
                                .filter(|d| d.status == MessageStatus::Pending)
                                .map(|d| MessagePatch::fail_pending(&d.id, SUPERSEDED_STEP_ERROR)),
                        );
                    }
                }

                let mut current: Option<OrderKey> = None;
                inputs
                    .iter()
                    .map(|input| {
                        let key = match current {
                            None => latest.map(OrderKey::next_order).unwrap_or_default(),
                            Some(prev) if input.message.role == MessageRole::User => prev.next_order(),
                            Some(prev) => prev.next_step(),
                        };
                        current = Some(key);
                        key
                    })
                    .collect::<Vec<_>>()
            }
        };

        let (embedding_ids, inserted_vectors) = match options.embeddings {
            Some(embeddings) => {
                let present: Vec<Vec<f32>> = embeddings.vectors.iter().flatten().cloned().collect();
                let inserted = if present.is_empty() {
                    Vec::new()
                } else {
                    self.vectors
                        .insert(&embeddings.model, embeddings.dimension, present)
                        .await?
                };
                let mut ids = inserted.iter().cloned();
                let per_input = embeddings
                    .vectors
                    .iter()
                    .map(|v| v.as_ref().and_then(|_| ids.next()))
                    .collect::<Vec<_>>();
                (per_input, inserted)
            }
            None => (vec![None; inputs.len()], Vec::new()),
        };

        let status = if options.pending {
            MessageStatus::Pending
        } else {
            MessageStatus::Success
        };
        let prompt_message_id = prompt.as_ref().map(|p| p.id.clone());
        let now = Utc::now();

        let docs: Vec<MessageDoc> = inputs
            .into_iter()
            .zip(keys)
            .zip(embedding_ids)
            .map(|((input, key), embedding_id)| MessageDoc {
                id: uuid::Uuid::new_v4().to_string(),
                thread_id: thread_id.to_string(),
                user_id: options.user_id.clone(),
                order: key.order,
                step_order: key.step_order,
                status,
                text: input.message.content.as_text(),
                tool: input.message.is_tool(),
                message: input.message,
                prompt_message_id: prompt_message_id.clone(),
                embedding_id,
                model: input.model,
                provider: input.provider,
                agent_name: input.agent_name,
                error: input.error,
                created_at: now,
            })
            .collect();

        write.inserts = docs.clone();
        let failed = write.patches.len();
        if let Err(e) = self.store.commit(write).await {
            // Vectors of a save that never landed are removed again.
            if !inserted_vectors.is_empty() {
                if let Err(cleanup) = self.vectors.delete(&inserted_vectors).await {
                    warn!(
                        thread_id = %thread_id,
                        vectors = inserted_vectors.len(),
                        error = %cleanup,
                        "could not remove vectors of a failed save"
                    );
                }
            }
            return Err(e);
        }

        debug!(
            thread_id = %thread_id,
            saved = docs.len(),
            failed_pending = failed,
            first_key = %docs[0].key(),
            "committed messages"
        );

        Ok(SaveMessagesResult {
            last_message_id: docs[docs.len() - 1].id.clone(),
            messages: docs,
        })
    }

    /// Move a pending message to success or failed, optionally replacing its content.
    pub async fn finalize_message(&self, message_id: &str, finalize: FinalizeMessage) -> Result<MessageDoc> {
        if !finalize.status.is_terminal() {
            return Err(PersistError::Validation(
                "a message can only be finalized as success or failed".to_string(),
            ));
        }

        let current = self.get_message(message_id).await?;
        let lock = self.thread_lock(&current.thread_id).await;
        let _guard = lock.lock().await;

        let mut doc = self.get_message(message_id).await?;
        if doc.status.is_terminal() {
            return Err(PersistError::Validation(format!(
                "message {} is already {}",
                message_id,
                doc.status.as_str()
            )));
        }

        let patch = MessagePatch {
            id: message_id.to_string(),
            expected: Some(MessageStatus::Pending),
            status: Some(finalize.status),
            message: finalize.message,
            error: finalize.error,
        };
        patch.apply(&mut doc);

        let mut write = LedgerWrite::new(&doc.thread_id);
        write.patches.push(patch);
        self.store.commit(write).await?;

        debug!(message_id = %message_id, status = doc.status.as_str(), "finalized message");
        Ok(doc)
    }

    pub async fn delete_messages(&self, message_ids: &[String]) -> Result<usize> {
        self.store.delete_messages(message_ids).await
    }
}
