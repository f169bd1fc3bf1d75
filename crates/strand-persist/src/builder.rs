use std::sync::Arc;

use strand_types::{LedgerConfig, StreamConfig};

use crate::dbs::memory::{MemoryDeltaStore, MemoryLedgerStore, MemoryVectorStore};
use crate::deltas::DeltaStore;
#[cfg(feature = "mongodb")]
use crate::error::PersistError;
use crate::error::Result;
use crate::store::LedgerStore;
use crate::vector::VectorStore;
use crate::PersistClient;

/// Assembles a [`PersistClient`]; any store left unset is kept in memory.
pub struct PersistClientBuilder {
    mongodb_uri: Option<String>,
    database: Option<String>,
    ledger_store: Option<Arc<dyn LedgerStore>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    delta_store: Option<Arc<dyn DeltaStore>>,
    ledger_config: LedgerConfig,
    stream_config: StreamConfig,
}

impl PersistClientBuilder {
    pub fn new() -> Self {
        Self {
            mongodb_uri: None,
            database: None,
            ledger_store: None,
            vector_store: None,
            delta_store: None,
            ledger_config: LedgerConfig::default(),
            stream_config: StreamConfig::default(),
        }
    }

    /// Keep the ledger in MongoDB (requires the `mongodb` feature)
    pub fn mongodb_uri(mut self, uri: impl Into<String>) -> Self {
        self.mongodb_uri = Some(uri.into());
        self
    }

    pub fn database(mut self, db: impl Into<String>) -> Self {
        self.database = Some(db.into());
        self
    }

    pub fn ledger_store(mut self, store: Arc<dyn LedgerStore>) -> Self {
        self.ledger_store = Some(store);
        self
    }

    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    pub fn delta_store(mut self, store: Arc<dyn DeltaStore>) -> Self {
        self.delta_store = Some(store);
        self
    }

    pub fn ledger_config(mut self, config: LedgerConfig) -> Self {
        self.ledger_config = config;
        self
    }

    pub fn stream_config(mut self, config: StreamConfig) -> Self {
        self.stream_config = config;
        self
    }

    pub async fn build(self) -> Result<PersistClient> {
        let ledger_store = match (self.ledger_store, self.mongodb_uri) {
            (Some(store), _) => store,
            (None, Some(uri)) => Self::connect_mongo(&uri, self.database).await?,
            (None, None) => Arc::new(MemoryLedgerStore::new()),
        };

        Ok(PersistClient::new(
            ledger_store,
            self.vector_store.unwrap_or_else(|| Arc::new(MemoryVectorStore::new())),
            self.delta_store.unwrap_or_else(|| Arc::new(MemoryDeltaStore::new())),
            self.ledger_config,
            self.stream_config,
        ))
    }

    #[cfg(feature = "mongodb")]
    async fn connect_mongo(uri: &str, database: Option<String>) -> Result<Arc<dyn LedgerStore>> {
        let database = database.ok_or_else(|| PersistError::Internal("database is required".to_string()))?;
        let store = crate::dbs::mongo::MongoLedgerStore::connect(uri, &database).await?;
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "mongodb"))]
    async fn connect_mongo(_uri: &str, _database: Option<String>) -> Result<Arc<dyn LedgerStore>> {
        Err(crate::error::PersistError::Connection(
            "built without the mongodb feature".to_string(),
        ))
    }
}

impl Default for PersistClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
