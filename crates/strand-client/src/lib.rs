//! Reader side of Strand.
//!
//! Turns delta batches into live [`UiMessage`]s, groups committed ledger
//! messages for display, merges both into one timeline and echoes prompts
//! before the ledger has them.

pub mod docs;
pub mod echo;
pub mod reconstructor;
pub mod reducer;
pub mod subscription;
pub mod timeline;
pub mod ui;

pub use docs::ui_messages_from_docs;
pub use echo::OptimisticEcho;
pub use reconstructor::{Phase, StreamReconstructor};
pub use reducer::Reducer;
pub use subscription::{DeltaSource, StreamSubscription};
pub use timeline::merge_timeline;
pub use ui::{ToolState, UiMessage, UiPart, UiSource, UiStatus};
