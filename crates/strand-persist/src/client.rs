use std::sync::Arc;

use strand_stream::StreamPart;
use strand_types::{LedgerConfig, StreamConfig, StreamMessage, StreamStatus};
use tracing::info;

use crate::builder::PersistClientBuilder;
use crate::dbs::memory::{MemoryDeltaStore, MemoryLedgerStore, MemoryVectorStore};
use crate::deltas::{DeltaStore, DeltaStreamer, DeltaSync};
use crate::error::{PersistError, Result};
use crate::ledger::MessageLedger;
use crate::models::{MessageInput, SaveMessagesOptions, SaveMessagesResult};
use crate::store::LedgerStore;
use crate::vector::VectorStore;

/// Entry point bundling the message ledger and the delta log
#[derive(Clone)]
pub struct PersistClient {
    ledger: Arc<MessageLedger>,
    deltas: DeltaSync,
}

impl PersistClient {
    pub fn new(
        ledger_store: Arc<dyn LedgerStore>,
        vector_store: Arc<dyn VectorStore>,
        delta_store: Arc<dyn DeltaStore>,
        ledger_config: LedgerConfig,
        stream_config: StreamConfig,
    ) -> Self {
        Self {
            ledger: Arc::new(MessageLedger::new(ledger_store, vector_store, ledger_config)),
            deltas: DeltaSync::new(delta_store, stream_config),
        }
    }

    /// Everything in process memory, with default configuration
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryLedgerStore::new()),
            Arc::new(MemoryVectorStore::new()),
            Arc::new(MemoryDeltaStore::new()),
            LedgerConfig::default(),
            StreamConfig::default(),
        )
    }

    pub fn builder() -> PersistClientBuilder {
        PersistClientBuilder::new()
    }

    pub fn ledger(&self) -> &MessageLedger {
        &self.ledger
    }

    pub fn deltas(&self) -> &DeltaSync {
        &self.deltas
    }

    /// Open a writer for a new stream
    pub async fn start_stream<P: StreamPart + Send>(&self, stream: StreamMessage) -> Result<DeltaStreamer<P>> {
        DeltaStreamer::create(self.deltas.store().clone(), self.deltas.config(), stream).await
    }

    /// Persist a stream's final messages, then drop its delta log.
    ///
    /// The stream is only touched once the messages are saved: a failed save
    /// leaves its status and log as they were. A stream still marked
    /// streaming is then finished before the log goes away.
    pub async fn commit_stream(
        &self,
        stream_id: &str,
        inputs: Vec<MessageInput>,
        options: SaveMessagesOptions,
    ) -> Result<SaveMessagesResult> {
        let store = self.deltas.store();
        let stream = store
            .get_stream(stream_id)
            .await?
            .ok_or_else(|| PersistError::StreamNotFound(stream_id.to_string()))?;

        let saved = self.ledger.save_messages(&stream.thread_id, inputs, options).await?;

        if stream.status == StreamStatus::Streaming {
            store.set_status(stream_id, StreamStatus::Finished, None).await?;
        }
        self.deltas.discard_stream(stream_id).await?;

        info!(
            stream_id = %stream_id,
            thread_id = %stream.thread_id,
            last_message_id = %saved.last_message_id,
            "committed stream"
        );
        Ok(saved)
    }

    /// Delete a thread, its messages and its streams
    pub async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.deltas.store().delete_thread_streams(thread_id).await?;
        self.ledger.delete_thread(thread_id).await
    }
}
