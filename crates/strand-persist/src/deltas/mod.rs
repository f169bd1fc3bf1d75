//! Delta log: the writer side ([`DeltaStreamer`]) and the cursor-based reader
//! ([`DeltaSync`]) over a shared [`DeltaStore`].

mod store;
mod streamer;
mod sync;

pub use store::DeltaStore;
pub use streamer::DeltaStreamer;
pub use sync::{DeltaSync, SyncedStream};
