use std::sync::Arc;

use futures::{Stream, StreamExt};
use strand_stream::{compact, PartBatcher, StreamPart};
use strand_types::{Cursor, DeltaRecord, StreamConfig, StreamMessage, StreamStatus};
use tracing::{debug, info, warn};

use crate::deltas::DeltaStore;
use crate::error::Result;

/// Single writer of one stream's delta log
///
/// Raw parts are buffered, compacted and appended as one [`DeltaRecord`] per
/// flush. Once the stream stops accepting appends (aborted elsewhere or
/// discarded) every further call returns `false`.
pub struct DeltaStreamer<P: StreamPart> {
    store: Arc<dyn DeltaStore>,
    stream: StreamMessage,
    batcher: PartBatcher<P>,
    /// Raw parts consumed so far
    cursor: Cursor,
    closed: bool,
}

impl<P: StreamPart + Send> DeltaStreamer<P> {
    /// Register `stream` and start writing to it.
    pub async fn create(store: Arc<dyn DeltaStore>, config: &StreamConfig, stream: StreamMessage) -> Result<Self> {
        store.create_stream(stream.clone()).await?;
        info!(
            stream_id = %stream.stream_id,
            thread_id = %stream.thread_id,
            key = %stream.key(),
            "opened stream"
        );

        Ok(Self {
            store,
            stream,
            batcher: PartBatcher::new(config.flush_window_ms, config.max_buffered_parts),
            cursor: Cursor::default(),
            closed: false,
        })
    }

    pub fn stream(&self) -> &StreamMessage {
        &self.stream
    }

    pub fn stream_id(&self) -> &str {
        &self.stream.stream_id
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Buffer one part, flushing when the buffer is full.
    pub async fn push(&mut self, part: P) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        self.batcher.push(part);
        if self.batcher.is_full() {
            return self.flush().await;
        }
        Ok(true)
    }

    pub async fn push_many(&mut self, parts: impl IntoIterator<Item = P>) -> Result<bool> {
        for part in parts {
            if !self.push(part).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Compact the buffered parts and append them as one record.
    ///
    /// Parts that compact to nothing still advance the cursor, so the next
    /// record starts after them. The buffer is only emptied once the store
    /// accepted the record; after a store error a later flush retries it.
    pub async fn flush(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        if self.batcher.is_empty() {
            return Ok(true);
        }

        let start = self.cursor;
        let end = start.advance(self.batcher.len() as u64);
        let parts: Vec<serde_json::Value> = compact(self.batcher.parts().iter().cloned())
            .iter()
            .map(P::to_value)
            .collect();

        if parts.is_empty() {
            self.batcher.take();
            self.cursor = end;
            return Ok(true);
        }

        let record = DeltaRecord {
            stream_id: self.stream.stream_id.clone(),
            start,
            end,
            parts,
        };
        let accepted = self.store.append_delta(record).await?;
        self.batcher.take();
        if !accepted {
            warn!(stream_id = %self.stream.stream_id, "stream stopped accepting deltas");
            self.closed = true;
            return Ok(false);
        }

        debug!(stream_id = %self.stream.stream_id, start = start.0, end = end.0, "appended delta");
        self.cursor = end;
        Ok(true)
    }

    /// Drain `parts`, flushing on the batcher's time window and size cap.
    /// Returns `false` if the stream stopped accepting appends midway.
    pub async fn pipe<S>(&mut self, parts: S) -> Result<bool>
    where
        S: Stream<Item = P>,
    {
        tokio::pin!(parts);

        loop {
            tokio::select! {
                next = parts.next() => match next {
                    Some(part) => {
                        if !self.push(part).await? {
                            return Ok(false);
                        }
                    }
                    None => break,
                },
                _ = self.batcher.ticker().tick() => {
                    if !self.flush().await? {
                        return Ok(false);
                    }
                }
            }
        }

        self.flush().await
    }

    /// Flush and mark the stream finished.
    pub async fn finish(mut self) -> Result<bool> {
        if !self.flush().await? {
            return Ok(false);
        }
        self.close(StreamStatus::Finished, None).await
    }

    /// Flush what was generated so far and mark the stream aborted.
    pub async fn abort(mut self, reason: impl Into<String>) -> Result<bool> {
        if !self.flush().await? {
            return Ok(false);
        }
        self.close(StreamStatus::Aborted, Some(reason.into())).await
    }

    async fn close(&mut self, status: StreamStatus, reason: Option<String>) -> Result<bool> {
        self.closed = true;
        let updated = self
            .store
            .set_status(&self.stream.stream_id, status, reason)
            .await?;
        info!(
            stream_id = %self.stream.stream_id,
            status = ?status,
            parts = self.cursor.0,
            "closed stream"
        );
        Ok(updated)
    }
}
