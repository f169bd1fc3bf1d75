use async_trait::async_trait;

use crate::error::Result;

/// Embedding storage consumed by the ledger
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store vectors of one model and dimension, returning one id per vector.
    async fn insert(&self, model: &str, dimension: usize, vectors: Vec<Vec<f32>>) -> Result<Vec<String>>;

    async fn delete(&self, ids: &[String]) -> Result<usize>;
}
