use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use strand_types::{Cursor, DeltaRecord, StreamMessage, StreamStatus};
use tokio::sync::RwLock;

use crate::deltas::DeltaStore;
use crate::error::{PersistError, Result};

#[derive(Default)]
struct Logs {
    streams: HashMap<String, StreamMessage>,
    deltas: HashMap<String, Vec<DeltaRecord>>,
}

/// In-process delta log
#[derive(Default)]
pub struct MemoryDeltaStore {
    logs: RwLock<Logs>,
}

impl MemoryDeltaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeltaStore for MemoryDeltaStore {
    async fn create_stream(&self, stream: StreamMessage) -> Result<()> {
        let mut logs = self.logs.write().await;
        if logs.streams.contains_key(&stream.stream_id) {
            return Err(PersistError::Validation(format!(
                "stream {} already exists",
                stream.stream_id
            )));
        }
        logs.deltas.insert(stream.stream_id.clone(), Vec::new());
        logs.streams.insert(stream.stream_id.clone(), stream);
        Ok(())
    }

    async fn get_stream(&self, stream_id: &str) -> Result<Option<StreamMessage>> {
        Ok(self.logs.read().await.streams.get(stream_id).cloned())
    }

    async fn list_streams(&self, thread_id: &str, statuses: &[StreamStatus]) -> Result<Vec<StreamMessage>> {
        let logs = self.logs.read().await;
        let mut streams: Vec<StreamMessage> = logs
            .streams
            .values()
            .filter(|s| s.thread_id == thread_id)
            .filter(|s| statuses.is_empty() || statuses.contains(&s.status))
            .cloned()
            .collect();
        streams.sort_by(|a, b| a.key().cmp(&b.key()).then_with(|| a.created_at.cmp(&b.created_at)));
        Ok(streams)
    }

    async fn set_status(
        &self,
        stream_id: &str,
        status: StreamStatus,
        abort_reason: Option<String>,
    ) -> Result<bool> {
        let mut logs = self.logs.write().await;
        match logs.streams.get_mut(stream_id) {
            Some(stream) if !stream.status.is_terminal() => {
                stream.status = status;
                stream.abort_reason = abort_reason;
                stream.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn append_delta(&self, delta: DeltaRecord) -> Result<bool> {
        if delta.end <= delta.start {
            return Err(PersistError::Validation(format!(
                "empty delta range {}..{}",
                delta.start, delta.end
            )));
        }

        let mut logs = self.logs.write().await;
        match logs.streams.get_mut(&delta.stream_id) {
            Some(stream) if stream.status == StreamStatus::Streaming => {
                stream.updated_at = Utc::now();
            }
            _ => return Ok(false),
        }

        let log = logs.deltas.entry(delta.stream_id.clone()).or_default();
        if let Some(last) = log.last() {
            if delta.start < last.end {
                return Err(PersistError::Validation(format!(
                    "delta {}..{} overlaps log ending at {}",
                    delta.start, delta.end, last.end
                )));
            }
        }
        log.push(delta);
        Ok(true)
    }

    async fn list_deltas(&self, stream_id: &str, after: Cursor) -> Result<Vec<DeltaRecord>> {
        let logs = self.logs.read().await;
        Ok(logs
            .deltas
            .get(stream_id)
            .map(|log| log.iter().filter(|d| d.start >= after).cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_stream(&self, stream_id: &str) -> Result<bool> {
        let mut logs = self.logs.write().await;
        logs.deltas.remove(stream_id);
        Ok(logs.streams.remove(stream_id).is_some())
    }

    async fn delete_thread_streams(&self, thread_id: &str) -> Result<usize> {
        let mut logs = self.logs.write().await;
        let doomed: Vec<String> = logs
            .streams
            .values()
            .filter(|s| s.thread_id == thread_id)
            .map(|s| s.stream_id.clone())
            .collect();
        for id in &doomed {
            logs.streams.remove(id);
            logs.deltas.remove(id);
        }
        Ok(doomed.len())
    }

    async fn terminal_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let logs = self.logs.read().await;
        Ok(logs
            .streams
            .values()
            .filter(|s| s.status.is_terminal() && s.updated_at < cutoff)
            .map(|s| s.stream_id.clone())
            .collect())
    }
}
