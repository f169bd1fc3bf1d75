//! Core data model shared by every Strand crate.
//!
//! Nothing in here performs I/O: ledger entries, threads, stream descriptors,
//! delta records and pagination envelopes are plain serializable values.

pub mod config;
pub mod message;
pub mod order;
pub mod page;
pub mod stream;
pub mod thread;

pub use config::{LedgerConfig, StreamConfig};
pub use message::{Content, ContentPart, Message, MessageDoc, MessageRole, MessageStatus};
pub use order::OrderKey;
pub use page::{Page, PaginationOpts, SortOrder};
pub use stream::{
    Cursor, DeltaBatch, DeltaRecord, StreamMessage, StreamStatus, TEXT_STREAM_PART_FORMAT,
    UI_MESSAGE_CHUNK_FORMAT,
};
pub use thread::{Thread, ThreadPatch, ThreadStatus};
