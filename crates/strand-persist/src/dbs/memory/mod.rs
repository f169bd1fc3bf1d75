mod deltas;
mod ledger;
mod vector;

pub use deltas::MemoryDeltaStore;
pub use ledger::MemoryLedgerStore;
pub use vector::{MemoryVectorStore, StoredVector};
