//! Live message reconstruction
//!
//! One [`StreamReconstructor`] per stream per reader. It starts from a blank
//! placeholder and folds every batch handed to it; it never writes anywhere.

use strand_types::{Cursor, DeltaBatch, StreamMessage, StreamStatus};
use tracing::debug;

use crate::reducer::Reducer;
use crate::ui::{UiMessage, UiSource, UiStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Blank,
    Streaming,
    Success,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct StreamReconstructor {
    stream: StreamMessage,
    reducer: Reducer,
    message: UiMessage,
    cursor: Cursor,
    phase: Phase,
}

impl StreamReconstructor {
    pub fn new(stream: StreamMessage) -> Self {
        let reducer = Reducer::for_stream(&stream);
        let mut message = UiMessage::new(
            stream.stream_id.clone(),
            stream.thread_id.clone(),
            stream.key(),
            stream.role,
            UiStatus::Streaming,
            UiSource::Stream,
        );
        message.agent_name = stream.agent_name.clone();
        message.created_at = stream.created_at;

        Self {
            stream,
            reducer,
            message,
            cursor: Cursor::default(),
            phase: Phase::Blank,
        }
    }

    pub fn stream(&self) -> &StreamMessage {
        &self.stream
    }

    pub fn message(&self) -> &UiMessage {
        &self.message
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Position to read from next
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn is_stalled(&self) -> bool {
        self.reducer.is_stalled()
    }

    /// Fold a batch. Records already folded are skipped, so redelivery is
    /// harmless. Returns whether anything visible changed.
    pub fn apply(&mut self, batch: &DeltaBatch) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        if self.reducer.is_stalled() {
            // Nothing is folded, but the log is not read again from 0.
            self.cursor = self.cursor.max(batch.cursor);
            return false;
        }

        let before = self.phase;
        let mut folded = 0;
        for record in &batch.deltas {
            if record.start < self.cursor {
                continue;
            }
            for fragment in &record.parts {
                self.reducer.fold(&mut self.message, fragment);
            }
            self.cursor = record.end;
            folded += 1;
        }
        self.cursor = self.cursor.max(batch.cursor);

        self.phase = match batch.status {
            StreamStatus::Streaming if folded > 0 => Phase::Streaming,
            StreamStatus::Streaming => self.phase,
            StreamStatus::Finished => Phase::Success,
            StreamStatus::Aborted => Phase::Failed,
        };
        self.message.status = match self.phase {
            Phase::Blank | Phase::Streaming => UiStatus::Streaming,
            Phase::Success => UiStatus::Success,
            Phase::Failed => UiStatus::Failed,
        };
        if self.phase == Phase::Failed {
            self.message.error = self.stream.abort_reason.clone();
        }

        if folded > 0 || before != self.phase {
            debug!(
                stream_id = %self.stream.stream_id,
                folded,
                cursor = self.cursor.0,
                phase = ?self.phase,
                "applied delta batch"
            );
            return true;
        }
        false
    }

    /// Keep the descriptor current, e.g. to pick up an abort reason.
    pub fn update_stream(&mut self, stream: StreamMessage) {
        if stream.stream_id == self.stream.stream_id {
            self.stream = stream;
        }
    }
}
