mod text;
mod ui;

pub use text::{FilePayload, TextStreamPart};
pub use ui::UiMessageChunk;
