use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::vector::VectorStore;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredVector {
    pub model: String,
    pub vector: Vec<f32>,
}

/// In-process vector storage
#[derive(Default)]
pub struct MemoryVectorStore {
    vectors: RwLock<HashMap<String, StoredVector>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &str) -> Option<StoredVector> {
        self.vectors.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.vectors.read().await.len()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn insert(&self, model: &str, dimension: usize, vectors: Vec<Vec<f32>>) -> Result<Vec<String>> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(PersistError::Validation(format!(
                "vector has dimension {}, expected {}",
                bad.len(),
                dimension
            )));
        }

        let mut stored = self.vectors.write().await;
        let ids = vectors
            .into_iter()
            .map(|vector| {
                let id = uuid::Uuid::new_v4().to_string();
                stored.insert(
                    id.clone(),
                    StoredVector {
                        model: model.to_string(),
                        vector,
                    },
                );
                id
            })
            .collect();
        Ok(ids)
    }

    async fn delete(&self, ids: &[String]) -> Result<usize> {
        let mut stored = self.vectors.write().await;
        Ok(ids.iter().filter(|id| stored.remove(*id).is_some()).count())
    }
}
