use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection};

use crate::dbs::mongo::models::MongoThread;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoThreadRepository {
    collection: Collection<MongoThread>,
}

impl MongoThreadRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("threads");
        Self { collection }
    }

    pub async fn insert(&self, thread: &MongoThread) -> Result<()> {
        self.collection.insert_one(thread).await?;
        Ok(())
    }

    pub async fn get(&self, thread_id: &str) -> Result<Option<MongoThread>> {
        Ok(self.collection.find_one(doc! { "_id": thread_id }).await?)
    }

    /// Returns false if no thread matched
    pub async fn replace(&self, thread: &MongoThread) -> Result<bool> {
        let result = self
            .collection
            .replace_one(doc! { "_id": thread.id.as_str() }, thread)
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn delete(&self, thread_id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": thread_id }).await?;
        Ok(result.deleted_count > 0)
    }

    /// Threads of a user, newest first
    pub async fn list_by_user(&self, user_id: &str, skip: usize, limit: usize) -> Result<Vec<MongoThread>> {
        let threads = self
            .collection
            .find(doc! { "user_id": user_id })
            .sort(doc! { "created_at": -1, "_id": -1 })
            .skip(skip as u64)
            .limit(limit as i64)
            .await?
            .try_collect()
            .await?;
        Ok(threads)
    }
}
