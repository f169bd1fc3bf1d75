use futures::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, ClientSession, Collection, IndexModel};
use strand_types::{OrderKey, SortOrder};

use crate::dbs::mongo::models::MongoMessage;
use crate::error::Result;
use crate::store::{MessagePatch, MessageQuery};

#[derive(Clone)]
pub struct MongoMessageRepository {
    collection: Collection<MongoMessage>,
}

impl MongoMessageRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("messages");
        Self { collection }
    }

    /// Unique ordered index backing key assignment
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "thread_id": 1, "order": 1, "step_order": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(index).await?;
        Ok(())
    }

    pub async fn get(&self, message_id: &str) -> Result<Option<MongoMessage>> {
        Ok(self.collection.find_one(doc! { "_id": message_id }).await?)
    }

    pub async fn get_many(&self, message_ids: &[String]) -> Result<Vec<MongoMessage>> {
        let messages = self
            .collection
            .find(doc! { "_id": { "$in": message_ids.to_vec() } })
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }

    pub async fn max_key(&self, thread_id: &str, order: Option<u64>) -> Result<Option<OrderKey>> {
        let mut filter = doc! { "thread_id": thread_id };
        if let Some(order) = order {
            filter.insert("order", order as i64);
        }

        let top = self
            .collection
            .find_one(filter)
            .sort(doc! { "order": -1, "step_order": -1 })
            .await?;
        Ok(top.map(|m| OrderKey::new(m.order.max(0) as u64, m.step_order.max(0) as u64)))
    }

    pub async fn at_order(&self, thread_id: &str, order: u64) -> Result<Vec<MongoMessage>> {
        let messages = self
            .collection
            .find(doc! { "thread_id": thread_id, "order": order as i64 })
            .sort(doc! { "step_order": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }

    pub async fn scan(&self, query: &MessageQuery) -> Result<Vec<MongoMessage>> {
        let mut filter = doc! { "thread_id": query.thread_id.as_str() };

        if query.exclude_tool {
            filter.insert("tool", false);
        }
        if let Some(statuses) = &query.statuses {
            let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
            filter.insert("status", doc! { "$in": statuses });
        }

        let (cmp, direction) = match query.order {
            SortOrder::Asc => ("$gt", 1),
            SortOrder::Desc => ("$lt", -1),
        };
        if let Some(after) = query.after {
            let order = after.order as i64;
            let mut past_order = Document::new();
            past_order.insert(cmp, order);
            let mut past_step = Document::new();
            past_step.insert(cmp, after.step_order as i64);
            filter.insert(
                "$or",
                vec![
                    doc! { "order": past_order },
                    doc! { "order": order, "step_order": past_step },
                ],
            );
        }

        let messages = self
            .collection
            .find(filter)
            .sort(doc! { "order": direction, "step_order": direction })
            .limit(query.limit as i64)
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }

    /// Key already used in the thread, checked inside the commit transaction
    pub async fn key_taken(&self, message: &MongoMessage, session: &mut ClientSession) -> Result<bool> {
        let existing = self
            .collection
            .find_one(doc! {
                "thread_id": message.thread_id.as_str(),
                "order": message.order,
                "step_order": message.step_order,
            })
            .session(session)
            .await?;
        Ok(existing.is_some())
    }

    pub async fn insert_many(&self, messages: &[MongoMessage], session: &mut ClientSession) -> Result<()> {
        if !messages.is_empty() {
            self.collection.insert_many(messages).session(session).await?;
        }
        Ok(())
    }

    /// Returns false if the message is missing or not in the expected status
    pub async fn apply_patch(&self, patch: &MessagePatch, session: &mut ClientSession) -> Result<bool> {
        let mut filter = doc! { "_id": patch.id.as_str() };
        if let Some(expected) = patch.expected {
            filter.insert("status", expected.as_str());
        }

        let mut set = Document::new();
        if let Some(status) = patch.status {
            set.insert("status", status.as_str());
        }
        if let Some(message) = &patch.message {
            set.insert("message", bson::to_bson(message)?);
            set.insert("text", message.content.as_text());
            set.insert("tool", message.is_tool());
        }
        if let Some(error) = &patch.error {
            set.insert("error", error.as_str());
        }
        if set.is_empty() {
            return Ok(true);
        }

        let result = self
            .collection
            .update_one(filter, doc! { "$set": set })
            .session(session)
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn delete_many(&self, message_ids: &[String]) -> Result<usize> {
        let result = self
            .collection
            .delete_many(doc! { "_id": { "$in": message_ids.to_vec() } })
            .await?;
        Ok(result.deleted_count as usize)
    }

    pub async fn delete_thread(&self, thread_id: &str) -> Result<usize> {
        let result = self.collection.delete_many(doc! { "thread_id": thread_id }).await?;
        Ok(result.deleted_count as usize)
    }
}
