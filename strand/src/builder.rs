//! High-level builder for a [`Strand`] handle

use anyhow::{Context, Result};
use std::time::Duration;

use crate::{LedgerConfig, PersistClient, Strand, StreamConfig};

/// High-level builder for a [`Strand`] handle
///
/// # Example
///
/// ```rust,no_run
/// use strand::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let strand = StrandBuilder::new()
///     .flush_window_ms(100)
///     .page_size(25)
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct StrandBuilder {
    // MongoDB
    mongodb_uri: Option<String>,
    database: Option<String>,

    ledger_config: LedgerConfig,
    stream_config: StreamConfig,
    refresh_interval: Duration,
}

impl Default for StrandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StrandBuilder {
    /// Everything in memory with default limits
    pub fn new() -> Self {
        Self {
            mongodb_uri: None,
            database: None,
            ledger_config: LedgerConfig::default(),
            stream_config: StreamConfig::default(),
            refresh_interval: Duration::from_millis(100),
        }
    }

    /// Keep the ledger in MongoDB (requires the `mongodb` feature)
    pub fn mongodb(mut self, uri: impl Into<String>, database: impl Into<String>) -> Self {
        self.mongodb_uri = Some(uri.into());
        self.database = Some(database.into());
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.ledger_config = self.ledger_config.with_default_page_size(size);
        self
    }

    pub fn flush_window_ms(mut self, ms: u64) -> Self {
        self.stream_config = self.stream_config.with_flush_window_ms(ms);
        self
    }

    pub fn stream_retention(mut self, retention: Duration) -> Self {
        self.stream_config = self.stream_config.with_retention(retention);
        self
    }

    /// How often subscriptions re-read the delta log
    pub fn refresh_interval(mut self, every: Duration) -> Self {
        self.refresh_interval = every;
        self
    }

    pub async fn build(self) -> Result<Strand> {
        let mut builder = PersistClient::builder()
            .ledger_config(self.ledger_config)
            .stream_config(self.stream_config.with_poll_interval_ms(self.refresh_interval.as_millis() as u64));
        if let Some(uri) = self.mongodb_uri {
            builder = builder.mongodb_uri(uri);
        }
        if let Some(database) = self.database {
            builder = builder.database(database);
        }

        let persist = builder.build().await.context("Failed to build persistence client")?;
        Ok(Strand::new(persist, self.refresh_interval))
    }
}
