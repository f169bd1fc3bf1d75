use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 200,
        }
    }
}

impl LedgerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn with_max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = size;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Time window between delta flushes while piping a generation
    pub flush_window_ms: u64,
    /// Force a flush once this many raw parts are buffered
    pub max_buffered_parts: usize,
    /// Poll interval used when tailing a stream
    pub poll_interval_ms: u64,
    /// How long terminal streams are kept before cleanup
    pub retention: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            flush_window_ms: 250,
            max_buffered_parts: 512,
            poll_interval_ms: 100,
            retention: Duration::from_secs(300),
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flush_window_ms(mut self, ms: u64) -> Self {
        self.flush_window_ms = ms;
        self
    }

    pub fn with_max_buffered_parts(mut self, parts: usize) -> Self {
        self.max_buffered_parts = parts;
        self
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }
}
