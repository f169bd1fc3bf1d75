use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use strand_types::{MessageDoc, OrderKey, SortOrder, Thread};
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::store::{LedgerStore, LedgerWrite, MessageQuery};

#[derive(Default)]
struct Tables {
    threads: HashMap<String, Thread>,
    messages: HashMap<String, MessageDoc>,
    /// (thread_id, key) -> message id
    by_key: BTreeMap<(String, OrderKey), String>,
}

impl Tables {
    fn thread_keys(&self, thread_id: &str) -> impl DoubleEndedIterator<Item = (&OrderKey, &String)> {
        let lo = (thread_id.to_string(), OrderKey::new(0, 0));
        let hi = (thread_id.to_string(), OrderKey::new(u64::MAX, u64::MAX));
        self.by_key.range(lo..=hi).map(|((_, key), id)| (key, id))
    }
}

/// In-process ledger storage
#[derive(Default)]
pub struct MemoryLedgerStore {
    tables: RwLock<Tables>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn insert_thread(&self, thread: Thread) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.threads.contains_key(&thread.id) {
            return Err(PersistError::Validation(format!("thread {} already exists", thread.id)));
        }
        tables.threads.insert(thread.id.clone(), thread);
        Ok(())
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        Ok(self.tables.read().await.threads.get(thread_id).cloned())
    }

    async fn replace_thread(&self, thread: Thread) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.threads.get_mut(&thread.id) {
            Some(slot) => {
                *slot = thread;
                Ok(())
            }
            None => Err(PersistError::ThreadNotFound(thread.id)),
        }
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.threads.remove(thread_id).is_none() {
            return Ok(false);
        }

        let doomed: Vec<(OrderKey, String)> = tables
            .thread_keys(thread_id)
            .map(|(key, id)| (*key, id.clone()))
            .collect();
        for (key, id) in doomed {
            tables.by_key.remove(&(thread_id.to_string(), key));
            tables.messages.remove(&id);
        }
        Ok(true)
    }

    async fn list_threads(&self, user_id: &str, skip: usize, limit: usize) -> Result<Vec<Thread>> {
        let tables = self.tables.read().await;
        let mut threads: Vec<&Thread> = tables
            .threads
            .values()
            .filter(|t| t.user_id.as_deref() == Some(user_id))
            .collect();
        threads.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(threads.into_iter().skip(skip).take(limit).cloned().collect())
    }

    async fn get_message(&self, message_id: &str) -> Result<Option<MessageDoc>> {
        Ok(self.tables.read().await.messages.get(message_id).cloned())
    }

    async fn get_messages(&self, message_ids: &[String]) -> Result<Vec<Option<MessageDoc>>> {
        let tables = self.tables.read().await;
        Ok(message_ids.iter().map(|id| tables.messages.get(id).cloned()).collect())
    }

    async fn max_key(&self, thread_id: &str, order: Option<u64>) -> Result<Option<OrderKey>> {
        let tables = self.tables.read().await;
        let key = match order {
            Some(order) => tables
                .thread_keys(thread_id)
                .rev()
                .map(|(key, _)| *key)
                .find(|key| key.order == order),
            None => tables.thread_keys(thread_id).next_back().map(|(key, _)| *key),
        };
        Ok(key)
    }

    async fn messages_at_order(&self, thread_id: &str, order: u64) -> Result<Vec<MessageDoc>> {
        let tables = self.tables.read().await;
        Ok(tables
            .thread_keys(thread_id)
            .filter(|(key, _)| key.order == order)
            .filter_map(|(_, id)| tables.messages.get(id).cloned())
            .collect())
    }

    async fn scan_messages(&self, query: &MessageQuery) -> Result<Vec<MessageDoc>> {
        let tables = self.tables.read().await;
        let docs = tables
            .thread_keys(&query.thread_id)
            .filter_map(|(_, id)| tables.messages.get(id));

        let matching = |doc: &&MessageDoc| query.matches(doc);
        let page: Vec<MessageDoc> = match query.order {
            SortOrder::Asc => docs.filter(matching).take(query.limit).cloned().collect(),
            SortOrder::Desc => docs.rev().filter(matching).take(query.limit).cloned().collect(),
        };
        Ok(page)
    }

    async fn commit(&self, write: LedgerWrite) -> Result<()> {
        let mut tables = self.tables.write().await;

        // Validate everything before touching the tables.
        for patch in &write.patches {
            let doc = tables
                .messages
                .get(&patch.id)
                .ok_or_else(|| PersistError::MessageNotFound(patch.id.clone()))?;
            if let Some(expected) = patch.expected {
                if doc.status != expected {
                    return Err(PersistError::Validation(format!(
                        "message {} is {}, expected {}",
                        patch.id,
                        doc.status.as_str(),
                        expected.as_str()
                    )));
                }
            }
        }

        let mut claimed = Vec::with_capacity(write.inserts.len());
        for doc in &write.inserts {
            let slot = (doc.thread_id.clone(), doc.key());
            if tables.by_key.contains_key(&slot) || claimed.contains(&slot) {
                return Err(PersistError::Validation(format!(
                    "key {} already taken in thread {}",
                    doc.key(),
                    doc.thread_id
                )));
            }
            if tables.messages.contains_key(&doc.id) {
                return Err(PersistError::Validation(format!("message {} already exists", doc.id)));
            }
            claimed.push(slot);
        }

        for patch in &write.patches {
            if let Some(doc) = tables.messages.get_mut(&patch.id) {
                patch.apply(doc);
            }
        }
        for doc in write.inserts {
            tables.by_key.insert((doc.thread_id.clone(), doc.key()), doc.id.clone());
            tables.messages.insert(doc.id.clone(), doc);
        }

        Ok(())
    }

    async fn delete_messages(&self, message_ids: &[String]) -> Result<usize> {
        let mut tables = self.tables.write().await;
        let mut deleted = 0;
        for id in message_ids {
            if let Some(doc) = tables.messages.remove(id) {
                tables.by_key.remove(&(doc.thread_id.clone(), doc.key()));
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
