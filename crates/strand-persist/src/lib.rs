//! Durable side of Strand: the message ledger, the delta log and the
//! storage contracts behind them.

pub mod builder;
pub mod client;
pub mod dbs;
pub mod deltas;
pub mod error;
pub mod ledger;
pub mod models;
pub mod store;
pub mod vector;

pub use builder::PersistClientBuilder;
pub use client::PersistClient;
pub use dbs::memory::{MemoryDeltaStore, MemoryLedgerStore, MemoryVectorStore};
#[cfg(feature = "mongodb")]
pub use dbs::mongo::MongoLedgerStore;
pub use deltas::{DeltaStore, DeltaStreamer, DeltaSync, SyncedStream};
pub use error::{PersistError, Result};
pub use ledger::MessageLedger;
pub use models::{
    CreateThreadArgs, Embedding, Embeddings, FinalizeMessage, ListMessagesArgs, MessageInput,
    SaveMessageArgs, SaveMessageInput, SaveMessageResult, SaveMessagesOptions, SaveMessagesResult,
};
pub use store::{LedgerStore, LedgerWrite, MessagePatch, MessageQuery};
pub use vector::VectorStore;
