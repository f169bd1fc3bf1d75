mod input;
mod query;

pub use input::{
    Embedding, Embeddings, MessageInput, SaveMessageArgs, SaveMessageInput, SaveMessageResult,
    SaveMessagesOptions, SaveMessagesResult,
};
pub use query::{CreateThreadArgs, FinalizeMessage, ListMessagesArgs};
