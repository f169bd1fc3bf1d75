use async_trait::async_trait;
use strand_types::{Message, MessageDoc, MessageStatus, OrderKey, SortOrder, Thread};

use crate::error::Result;

/// Partial update of one ledger entry
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePatch {
    pub id: String,
    /// The write is rejected unless the entry currently has this status
    pub expected: Option<MessageStatus>,
    pub status: Option<MessageStatus>,
    pub message: Option<Message>,
    pub error: Option<String>,
}

impl MessagePatch {
    /// Pending to failed, for steps abandoned by a newer generation
    pub fn fail_pending(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            expected: Some(MessageStatus::Pending),
            status: Some(MessageStatus::Failed),
            message: None,
            error: Some(error.into()),
        }
    }

    pub fn apply(&self, doc: &mut MessageDoc) {
        if let Some(status) = self.status {
            doc.status = status;
        }
        if let Some(message) = &self.message {
            doc.text = message.content.as_text();
            doc.tool = message.is_tool();
            doc.message = message.clone();
        }
        if let Some(error) = &self.error {
            doc.error = Some(error.clone());
        }
    }
}

/// Everything one ledger call writes, committed atomically
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerWrite {
    pub thread_id: String,
    pub patches: Vec<MessagePatch>,
    pub inserts: Vec<MessageDoc>,
}

impl LedgerWrite {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty() && self.inserts.is_empty()
    }
}

/// Range scan over one thread's ordered index
#[derive(Debug, Clone, PartialEq)]
pub struct MessageQuery {
    pub thread_id: String,
    pub statuses: Option<Vec<MessageStatus>>,
    pub exclude_tool: bool,
    pub order: SortOrder,
    /// Exclusive bound in scan direction
    pub after: Option<OrderKey>,
    pub limit: usize,
}

impl MessageQuery {
    pub fn matches(&self, doc: &MessageDoc) -> bool {
        if self.exclude_tool && doc.tool {
            return false;
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&doc.status) {
                return false;
            }
        }
        match (self.after, self.order) {
            (Some(after), SortOrder::Asc) => doc.key() > after,
            (Some(after), SortOrder::Desc) => doc.key() < after,
            (None, _) => true,
        }
    }
}

/// Storage primitives behind the message ledger
///
/// Implementations must keep `(thread_id, order, step_order)` unique and
/// apply a [`LedgerWrite`] all-or-nothing.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_thread(&self, thread: Thread) -> Result<()>;

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>>;

    /// Overwrite a stored thread; `ThreadNotFound` if it is gone
    async fn replace_thread(&self, thread: Thread) -> Result<()>;

    /// Delete a thread and every message in it. Returns false if absent.
    async fn delete_thread(&self, thread_id: &str) -> Result<bool>;

    /// Threads of a user, newest first
    async fn list_threads(&self, user_id: &str, skip: usize, limit: usize) -> Result<Vec<Thread>>;

    async fn get_message(&self, message_id: &str) -> Result<Option<MessageDoc>>;

    /// One slot per id, in input order
    async fn get_messages(&self, message_ids: &[String]) -> Result<Vec<Option<MessageDoc>>>;

    /// Highest key in the thread, or within one order
    async fn max_key(&self, thread_id: &str, order: Option<u64>) -> Result<Option<OrderKey>>;

    /// Every step at `order`, ascending
    async fn messages_at_order(&self, thread_id: &str, order: u64) -> Result<Vec<MessageDoc>>;

    async fn scan_messages(&self, query: &MessageQuery) -> Result<Vec<MessageDoc>>;

    /// Atomic: patches and inserts land together or not at all.
    /// Key collisions and failed status expectations are `Validation` errors.
    async fn commit(&self, write: LedgerWrite) -> Result<()>;

    async fn delete_messages(&self, message_ids: &[String]) -> Result<usize>;
}
