use async_trait::async_trait;
use mongodb::Client;
use strand_types::{MessageDoc, OrderKey, Thread};
use tracing::{debug, warn};

use crate::dbs::mongo::models::{MongoMessage, MongoThread};
use crate::dbs::mongo::repositories::{MongoMessageRepository, MongoThreadRepository};
use crate::error::{PersistError, Result};
use crate::store::{LedgerStore, LedgerWrite, MessageQuery};

/// Ledger storage on MongoDB
///
/// Commits run in a multi-document transaction, which needs a replica set
/// or sharded deployment.
pub struct MongoLedgerStore {
    client: Client,
    messages: MongoMessageRepository,
    threads: MongoThreadRepository,
}

impl MongoLedgerStore {
    /// Connect to MongoDB and make sure the ordered index exists
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        let messages = MongoMessageRepository::new(&client, database);
        let threads = MongoThreadRepository::new(&client, database);
        messages.ensure_indexes().await?;

        debug!(database = %database, "connected ledger store");
        Ok(Self {
            client,
            messages,
            threads,
        })
    }

    async fn commit_in_session(&self, write: &LedgerWrite, session: &mut mongodb::ClientSession) -> Result<()> {
        for patch in &write.patches {
            if !self.messages.apply_patch(patch, session).await? {
                return Err(PersistError::Validation(format!(
                    "message {} is missing or no longer {}",
                    patch.id,
                    patch.expected.map(|s| s.as_str()).unwrap_or("present")
                )));
            }
        }

        let inserts: Vec<MongoMessage> = write.inserts.iter().cloned().map(MongoMessage::from).collect();
        for message in &inserts {
            if self.messages.key_taken(message, session).await? {
                return Err(PersistError::Validation(format!(
                    "key {}.{} already taken in thread {}",
                    message.order, message.step_order, message.thread_id
                )));
            }
        }
        self.messages.insert_many(&inserts, session).await
    }
}

fn is_duplicate_key(err: &PersistError) -> bool {
    matches!(err, PersistError::Database(e) if e.to_string().contains("E11000"))
}

#[async_trait]
impl LedgerStore for MongoLedgerStore {
    async fn insert_thread(&self, thread: Thread) -> Result<()> {
        self.threads.insert(&MongoThread::from(thread)).await
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        Ok(self.threads.get(thread_id).await?.map(Thread::from))
    }

    async fn replace_thread(&self, thread: Thread) -> Result<()> {
        let id = thread.id.clone();
        if self.threads.replace(&MongoThread::from(thread)).await? {
            Ok(())
        } else {
            Err(PersistError::ThreadNotFound(id))
        }
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<bool> {
        let deleted = self.threads.delete(thread_id).await?;
        if deleted {
            let messages = self.messages.delete_thread(thread_id).await?;
            debug!(thread_id = %thread_id, messages, "deleted thread messages");
        }
        Ok(deleted)
    }

    async fn list_threads(&self, user_id: &str, skip: usize, limit: usize) -> Result<Vec<Thread>> {
        let threads = self.threads.list_by_user(user_id, skip, limit).await?;
        Ok(threads.into_iter().map(Thread::from).collect())
    }

    async fn get_message(&self, message_id: &str) -> Result<Option<MessageDoc>> {
        Ok(self.messages.get(message_id).await?.map(MessageDoc::from))
    }

    async fn get_messages(&self, message_ids: &[String]) -> Result<Vec<Option<MessageDoc>>> {
        let mut found: Vec<MessageDoc> = self
            .messages
            .get_many(message_ids)
            .await?
            .into_iter()
            .map(MessageDoc::from)
            .collect();

        Ok(message_ids
            .iter()
            .map(|id| {
                found
                    .iter()
                    .position(|m| &m.id == id)
                    .map(|i| found.swap_remove(i))
            })
            .collect())
    }

    async fn max_key(&self, thread_id: &str, order: Option<u64>) -> Result<Option<OrderKey>> {
        self.messages.max_key(thread_id, order).await
    }

    async fn messages_at_order(&self, thread_id: &str, order: u64) -> Result<Vec<MessageDoc>> {
        let messages = self.messages.at_order(thread_id, order).await?;
        Ok(messages.into_iter().map(MessageDoc::from).collect())
    }

    async fn scan_messages(&self, query: &MessageQuery) -> Result<Vec<MessageDoc>> {
        let messages = self.messages.scan(query).await?;
        Ok(messages.into_iter().map(MessageDoc::from).collect())
    }

    async fn commit(&self, write: LedgerWrite) -> Result<()> {
        if write.is_empty() {
            return Ok(());
        }

        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        match self.commit_in_session(&write, &mut session).await {
            Ok(()) => {
                session.commit_transaction().await?;
                Ok(())
            }
            Err(err) => {
                if let Err(abort) = session.abort_transaction().await {
                    warn!(error = %abort, "failed to abort ledger transaction");
                }
                if is_duplicate_key(&err) {
                    return Err(PersistError::Validation(format!(
                        "key collision in thread {}",
                        write.thread_id
                    )));
                }
                Err(err)
            }
        }
    }

    async fn delete_messages(&self, message_ids: &[String]) -> Result<usize> {
        self.messages.delete_many(message_ids).await
    }
}
