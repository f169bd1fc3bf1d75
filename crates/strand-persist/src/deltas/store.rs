use async_trait::async_trait;
use chrono::{DateTime, Utc};
use strand_types::{Cursor, DeltaRecord, StreamMessage, StreamStatus};

use crate::error::Result;

/// Storage for stream descriptors and their delta logs
///
/// One writer appends per stream; any number of readers list.
#[async_trait]
pub trait DeltaStore: Send + Sync {
    async fn create_stream(&self, stream: StreamMessage) -> Result<()>;

    async fn get_stream(&self, stream_id: &str) -> Result<Option<StreamMessage>>;

    /// Streams of a thread in key order. An empty `statuses` means all.
    async fn list_streams(&self, thread_id: &str, statuses: &[StreamStatus]) -> Result<Vec<StreamMessage>>;

    /// Move a streaming stream to `status`. False if missing or already terminal.
    async fn set_status(
        &self,
        stream_id: &str,
        status: StreamStatus,
        abort_reason: Option<String>,
    ) -> Result<bool>;

    /// Append one record. False when the stream is missing or no longer
    /// streaming; `Validation` when the record overlaps the log.
    async fn append_delta(&self, delta: DeltaRecord) -> Result<bool>;

    /// Records with `start >= after`, in log order
    async fn list_deltas(&self, stream_id: &str, after: Cursor) -> Result<Vec<DeltaRecord>>;

    /// Remove a stream and its log. False if absent.
    async fn delete_stream(&self, stream_id: &str) -> Result<bool>;

    async fn delete_thread_streams(&self, thread_id: &str) -> Result<usize>;

    /// Terminal streams last updated before `cutoff`
    async fn terminal_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>>;
}
