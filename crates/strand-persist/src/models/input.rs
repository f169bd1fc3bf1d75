use serde::{Deserialize, Serialize};
use strand_types::{Message, MessageDoc};

use crate::error::{PersistError, Result};

/// A message handed to the ledger, plus generation provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInput {
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageInput {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            model: None,
            provider: None,
            agent_name: None,
            error: None,
        }
    }

    pub fn with_model(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self.model = Some(model.into());
        self
    }

    pub fn with_agent_name(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = Some(agent_name.into());
        self
    }
}

impl From<Message> for MessageInput {
    fn from(message: Message) -> Self {
        Self::new(message)
    }
}

/// Embeddings for a batch of inputs, one optional vector per input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embeddings {
    pub model: String,
    pub dimension: usize,
    pub vectors: Vec<Option<Vec<f32>>>,
}

impl Embeddings {
    /// Checked before anything is written.
    pub fn validate(&self, input_count: usize) -> Result<()> {
        if self.vectors.len() != input_count {
            return Err(PersistError::Validation(format!(
                "expected {} embedding slots, got {}",
                input_count,
                self.vectors.len()
            )));
        }

        for (i, vector) in self.vectors.iter().enumerate() {
            if let Some(vector) = vector {
                if vector.len() != self.dimension {
                    return Err(PersistError::Validation(format!(
                        "embedding {} has dimension {}, expected {}",
                        i,
                        vector.len(),
                        self.dimension
                    )));
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveMessagesOptions {
    #[serde(default)]
    pub user_id: Option<String>,
    /// Message these inputs respond to; they land at its order
    #[serde(default)]
    pub prompt_message_id: Option<String>,
    #[serde(default)]
    pub pending: bool,
    /// Fail still-pending steps of the same prompt in the same commit
    #[serde(default)]
    pub fail_pending_steps: bool,
    #[serde(default)]
    pub embeddings: Option<Embeddings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMessagesResult {
    pub last_message_id: String,
    pub messages: Vec<MessageDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMessageInput {
    Message(MessageInput),
    /// Bare prompt text, saved as a user message
    Prompt(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub model: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMessageArgs {
    pub input: SaveMessageInput,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub prompt_message_id: Option<String>,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub fail_pending_steps: bool,
    #[serde(default)]
    pub embedding: Option<Embedding>,
}

impl SaveMessageArgs {
    pub fn prompt(text: impl Into<String>) -> Self {
        Self::with_input(SaveMessageInput::Prompt(text.into()))
    }

    pub fn message(message: impl Into<MessageInput>) -> Self {
        Self::with_input(SaveMessageInput::Message(message.into()))
    }

    fn with_input(input: SaveMessageInput) -> Self {
        Self {
            input,
            user_id: None,
            prompt_message_id: None,
            pending: false,
            fail_pending_steps: false,
            embedding: None,
        }
    }

    pub(crate) fn into_batch(self) -> (MessageInput, SaveMessagesOptions) {
        let input = match self.input {
            SaveMessageInput::Message(input) => input,
            SaveMessageInput::Prompt(text) => MessageInput::new(Message::user(text)),
        };

        let embeddings = self.embedding.map(|e| Embeddings {
            model: e.model,
            dimension: e.vector.len(),
            vectors: vec![Some(e.vector)],
        });

        let options = SaveMessagesOptions {
            user_id: self.user_id,
            prompt_message_id: self.prompt_message_id,
            pending: self.pending,
            fail_pending_steps: self.fail_pending_steps,
            embeddings,
        };

        (input, options)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMessageResult {
    pub message_id: String,
    pub message: MessageDoc,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embeddings_count_mismatch() {
        let embeddings = Embeddings {
            model: "embed".to_string(),
            dimension: 2,
            vectors: vec![Some(vec![0.1, 0.2])],
        };
        assert!(embeddings.validate(1).is_ok());
        assert!(matches!(embeddings.validate(2), Err(PersistError::Validation(_))));
    }

    #[test]
    fn test_embeddings_dimension_mismatch() {
        let embeddings = Embeddings {
            model: "embed".to_string(),
            dimension: 3,
            vectors: vec![None, Some(vec![0.1, 0.2])],
        };
        let err = embeddings.validate(2).unwrap_err();
        assert!(err.to_string().contains("dimension 2"));
    }

    #[test]
    fn test_prompt_becomes_user_message() {
        let (input, options) = SaveMessageArgs::prompt("hi").into_batch();
        assert_eq!(input.message, Message::user("hi"));
        assert!(options.embeddings.is_none());
        assert!(!options.pending);
    }
}
