//! # Strand
//!
//! Strand keeps long-running, multi-step model conversations in one ordered
//! timeline:
//! - **Message ledger**: every message sits at a unique `(order, step_order)` key
//! - **Delta log**: generations stream as compacted, cursor-addressed records
//! - **Live readers**: clients rebuild in-flight messages from the log and
//!   merge them with the committed history
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strand::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let strand = StrandBuilder::new().build().await?;
//!     let thread = strand.persist().ledger().create_thread(CreateThreadArgs::default()).await?;
//!
//!     let prompt = strand
//!         .persist()
//!         .ledger()
//!         .save_message(&thread.id, SaveMessageArgs::prompt("Hello!"))
//!         .await?;
//!
//!     let mut writer = strand
//!         .persist()
//!         .start_stream::<TextStreamPart>(StreamMessage::new(
//!             thread.id.as_str(),
//!             prompt.message.key().next_step(),
//!             Some(TEXT_STREAM_PART_FORMAT.to_string()),
//!         ))
//!         .await?;
//!     writer.push(TextStreamPart::text("Hi there")).await?;
//!     writer.finish().await?;
//!
//!     let subscription = strand.subscribe(&thread.id);
//!     subscription.refresh().await?;
//!     for message in strand.timeline(&thread.id, subscription.messages()).await? {
//!         println!("{:?}: {}", message.role, message.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **strand-types**: Plain data model (keys, threads, messages, deltas)
//! - **strand-stream**: Wire formats and delta compaction
//! - **strand-persist**: Ledger, delta log and storage backends
//! - **strand-client**: Reconstruction, timeline merge, optimistic echo

use std::sync::Arc;
use std::time::Duration;

// Re-export all public APIs
pub use strand_client as client;
pub use strand_persist as persist;
pub use strand_stream as stream;
pub use strand_types as types;

// Re-export commonly used types
pub use strand_client::{
    merge_timeline, ui_messages_from_docs, OptimisticEcho, StreamReconstructor, StreamSubscription,
    UiMessage,
};
pub use strand_persist::{DeltaSync, PersistClient, PersistError};
pub use strand_types::{LedgerConfig, StreamConfig};

/// High-level builder
pub mod builder;

pub use builder::StrandBuilder;

/// Ledger plus delta log, with reader-side helpers
#[derive(Clone)]
pub struct Strand {
    persist: PersistClient,
    refresh_interval: Duration,
}

impl Strand {
    pub fn new(persist: PersistClient, refresh_interval: Duration) -> Self {
        Self {
            persist,
            refresh_interval,
        }
    }

    pub fn builder() -> StrandBuilder {
        StrandBuilder::new()
    }

    pub fn persist(&self) -> &PersistClient {
        &self.persist
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Live view of a thread's streams
    pub fn subscribe(&self, thread_id: &str) -> Arc<StreamSubscription<DeltaSync>> {
        Arc::new(StreamSubscription::new(
            Arc::new(self.persist.deltas().clone()),
            Some(thread_id.to_string()),
        ))
    }

    /// Whole committed history merged with `live` stream messages, oldest first
    pub async fn timeline(&self, thread_id: &str, live: Vec<UiMessage>) -> persist::Result<Vec<UiMessage>> {
        let ledger = self.persist.ledger();
        let page_size = ledger.config().max_page_size;

        let mut docs = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut args = persist::ListMessagesArgs::new(page_size).ascending();
            if let Some(c) = cursor.take() {
                args = args.after(c);
            }
            let page = ledger.list_messages(thread_id, args).await?;
            docs.extend(page.page);
            match page.continue_cursor {
                Some(next) if !page.is_done => cursor = Some(next),
                _ => break,
            }
        }

        tracing::debug!(thread_id = %thread_id, committed = docs.len(), "loaded timeline");
        Ok(merge_timeline(ui_messages_from_docs(&docs), live))
    }
}

/// Convenient prelude with commonly used types
pub mod prelude {
    pub use crate::builder::StrandBuilder;
    pub use crate::client::{OptimisticEcho, StreamSubscription, UiMessage, UiPart, UiStatus};
    pub use crate::persist::{
        CreateThreadArgs, FinalizeMessage, ListMessagesArgs, MessageInput, PersistClient,
        SaveMessageArgs, SaveMessagesOptions,
    };
    pub use crate::stream::{TextStreamPart, UiMessageChunk};
    pub use crate::types::{
        Message, MessageRole, OrderKey, StreamMessage, TEXT_STREAM_PART_FORMAT,
        UI_MESSAGE_CHUNK_FORMAT,
    };
    pub use crate::Strand;
    pub use anyhow::Result;
}
