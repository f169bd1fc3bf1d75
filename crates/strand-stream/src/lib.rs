pub mod buffer_utils;
pub mod compactor;
pub mod format;
pub mod parts;

pub use buffer_utils::PartBatcher;
pub use compactor::{compact, compact_values, StreamPart};
pub use format::{StreamFormat, UnknownFormat};
pub use parts::{FilePayload, TextStreamPart, UiMessageChunk};
