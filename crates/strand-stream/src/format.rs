use std::fmt;

use strand_types::{TEXT_STREAM_PART_FORMAT, UI_MESSAGE_CHUNK_FORMAT};

/// Wire shape of the parts stored in a stream's delta log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamFormat {
    UiMessageChunk,
    TextStreamPart,
    /// Writers that never declared a format; replayed like `TextStreamPart`
    Legacy,
}

/// A format tag no reducer understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFormat(pub String);

impl fmt::Display for UnknownFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown stream format: {}", self.0)
    }
}

impl std::error::Error for UnknownFormat {}

impl StreamFormat {
    pub fn from_tag(tag: Option<&str>) -> Result<Self, UnknownFormat> {
        match tag {
            None => Ok(Self::Legacy),
            Some(UI_MESSAGE_CHUNK_FORMAT) => Ok(Self::UiMessageChunk),
            Some(TEXT_STREAM_PART_FORMAT) => Ok(Self::TextStreamPart),
            Some(other) => Err(UnknownFormat(other.to_string())),
        }
    }

    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Self::UiMessageChunk => Some(UI_MESSAGE_CHUNK_FORMAT),
            Self::TextStreamPart => Some(TEXT_STREAM_PART_FORMAT),
            Self::Legacy => None,
        }
    }
}
