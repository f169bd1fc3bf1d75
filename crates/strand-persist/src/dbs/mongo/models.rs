use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strand_types::{Message, MessageDoc, MessageStatus, Thread, ThreadStatus};

/// Stored shape of a ledger entry. BSON has no unsigned integers, so keys
/// are kept as `i64`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub thread_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub order: i64,
    pub step_order: i64,
    pub status: MessageStatus,
    pub message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub tool: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoThread {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub status: ThreadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MessageDoc> for MongoMessage {
    fn from(doc: MessageDoc) -> Self {
        Self {
            id: doc.id,
            thread_id: doc.thread_id,
            user_id: doc.user_id,
            order: doc.order as i64,
            step_order: doc.step_order as i64,
            status: doc.status,
            message: doc.message,
            text: doc.text,
            tool: doc.tool,
            prompt_message_id: doc.prompt_message_id,
            embedding_id: doc.embedding_id,
            model: doc.model,
            provider: doc.provider,
            agent_name: doc.agent_name,
            error: doc.error,
            created_at: doc.created_at,
        }
    }
}

impl From<MongoMessage> for MessageDoc {
    fn from(msg: MongoMessage) -> Self {
        Self {
            id: msg.id,
            thread_id: msg.thread_id,
            user_id: msg.user_id,
            order: msg.order.max(0) as u64,
            step_order: msg.step_order.max(0) as u64,
            status: msg.status,
            message: msg.message,
            text: msg.text,
            tool: msg.tool,
            prompt_message_id: msg.prompt_message_id,
            embedding_id: msg.embedding_id,
            model: msg.model,
            provider: msg.provider,
            agent_name: msg.agent_name,
            error: msg.error,
            created_at: msg.created_at,
        }
    }
}

impl From<Thread> for MongoThread {
    fn from(thread: Thread) -> Self {
        Self {
            id: thread.id,
            user_id: thread.user_id,
            title: thread.title,
            summary: thread.summary,
            status: thread.status,
            created_at: thread.created_at,
            updated_at: thread.updated_at,
        }
    }
}

impl From<MongoThread> for Thread {
    fn from(thread: MongoThread) -> Self {
        Self {
            id: thread.id,
            user_id: thread.user_id,
            title: thread.title,
            summary: thread.summary,
            status: thread.status,
            created_at: thread.created_at,
            updated_at: thread.updated_at,
        }
    }
}
