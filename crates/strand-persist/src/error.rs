use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[cfg(feature = "mongodb")]
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON serialization error: {0}")]
    BsonSerialization(#[from] bson::ser::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON deserialization error: {0}")]
    BsonDeserialization(#[from] bson::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PersistError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ThreadNotFound(_) | Self::MessageNotFound(_) | Self::StreamNotFound(_)
        )
    }

    /// Errors caused by the caller's input rather than the storage layer
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidCursor(_))
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;
