use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::Stream;
use strand_types::{Cursor, DeltaBatch, StreamConfig, StreamMessage, StreamStatus};
use tracing::{debug, info};

use crate::deltas::DeltaStore;
use crate::error::Result;

/// One stream's share of a thread-wide sync
#[derive(Debug, Clone, PartialEq)]
pub struct SyncedStream {
    /// `None` once the stream has been discarded
    pub stream: Option<StreamMessage>,
    pub batch: DeltaBatch,
}

/// Incremental reader over the delta log
#[derive(Clone)]
pub struct DeltaSync {
    store: Arc<dyn DeltaStore>,
    config: StreamConfig,
}

impl DeltaSync {
    pub fn new(store: Arc<dyn DeltaStore>, config: StreamConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn DeltaStore> {
        &self.store
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Records starting at or after `after` (0 when omitted), the cursor to
    /// pass next time, and the stream status. A missing stream reads as
    /// finished and empty.
    pub async fn read_deltas(&self, stream_id: &str, after: Option<Cursor>) -> Result<DeltaBatch> {
        let after = after.unwrap_or_default();

        // Status first: a terminal status must never hide a record appended
        // just before it.
        let Some(stream) = self.store.get_stream(stream_id).await? else {
            return Ok(DeltaBatch::finished_empty(stream_id, after));
        };

        let deltas = self.store.list_deltas(stream_id, after).await?;
        let cursor = deltas.last().map(|d| d.end).unwrap_or(after);

        Ok(DeltaBatch {
            stream_id: stream_id.to_string(),
            deltas,
            cursor,
            status: stream.status,
        })
    }

    /// Streams of a thread, `statuses` empty meaning all
    pub async fn list_streams(&self, thread_id: &str, statuses: &[StreamStatus]) -> Result<Vec<StreamMessage>> {
        self.store.list_streams(thread_id, statuses).await
    }

    /// Reads every stream of a thread that still has a log, terminal ones
    /// included, so late joiners see finished and aborted content until it is
    /// committed or cleaned up. Tracked streams that are gone come back with
    /// `stream: None`.
    pub async fn sync_streams(&self, thread_id: &str, cursors: &HashMap<String, Cursor>) -> Result<Vec<SyncedStream>> {
        let streams = self.store.list_streams(thread_id, &[]).await?;
        let mut synced = Vec::new();

        for stream in streams {
            let known = cursors.get(&stream.stream_id).copied();
            let batch = self.read_deltas(&stream.stream_id, known).await?;
            synced.push(SyncedStream {
                stream: Some(stream),
                batch,
            });
        }

        for (stream_id, cursor) in cursors {
            if !synced.iter().any(|s| &s.batch.stream_id == stream_id) {
                synced.push(SyncedStream {
                    stream: None,
                    batch: DeltaBatch::finished_empty(stream_id.as_str(), *cursor),
                });
            }
        }

        Ok(synced)
    }

    /// Polls a stream until it is terminal, yielding each non-empty batch and
    /// the final one.
    pub fn tail(&self, stream_id: &str, after: Option<Cursor>) -> impl Stream<Item = Result<DeltaBatch>> + Send + 'static {
        let sync = self.clone();
        let stream_id = stream_id.to_string();
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));

        async_stream::try_stream! {
            let mut cursor = after;
            loop {
                let batch = sync.read_deltas(&stream_id, cursor).await?;
                cursor = Some(batch.cursor);
                let terminal = batch.status.is_terminal();

                if terminal || !batch.deltas.is_empty() {
                    yield batch;
                }
                if terminal {
                    break;
                }
                tokio::time::sleep(poll).await;
            }
        }
    }

    /// Drop a stream and its log. Readers see it as finished afterwards.
    pub async fn discard_stream(&self, stream_id: &str) -> Result<bool> {
        let removed = self.store.delete_stream(stream_id).await?;
        debug!(stream_id = %stream_id, removed, "discarded stream");
        Ok(removed)
    }

    /// Remove terminal streams untouched for longer than `older_than`.
    pub async fn cleanup(&self, older_than: Duration) -> Result<usize> {
        let cutoff = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let expired = self.store.terminal_before(cutoff).await?;

        let mut removed = 0;
        for stream_id in &expired {
            if self.store.delete_stream(stream_id).await? {
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "cleaned up terminal streams");
        }
        Ok(removed)
    }

    /// [`DeltaSync::cleanup`] with the configured retention
    pub async fn cleanup_expired(&self) -> Result<usize> {
        self.cleanup(self.config.retention).await
    }
}
