use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use strand_types::{LedgerConfig, StreamConfig};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ledger: LedgerSettings,
    #[serde(default)]
    pub streams: StreamSettings,
    #[serde(default)]
    pub logging: LoggingConfig,

    // Secret (from ENV only)
    #[serde(skip)]
    pub mongodb_uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// SSE tails hold a request open, so keep this generous
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    #[serde(default)]
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Database name, used when `MONGODB_URI` is set
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: "strand".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSettings {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        let defaults = LedgerConfig::default();
        Self {
            default_page_size: defaults.default_page_size,
            max_page_size: defaults.max_page_size,
        }
    }
}

impl From<LedgerSettings> for LedgerConfig {
    fn from(settings: LedgerSettings) -> Self {
        LedgerConfig::new()
            .with_default_page_size(settings.default_page_size)
            .with_max_page_size(settings.max_page_size)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamSettings {
    pub flush_window_ms: u64,
    pub max_buffered_parts: usize,
    pub poll_interval_ms: u64,
    pub retention_secs: u64,
    /// How often expired streams are swept; 0 disables the sweep
    pub cleanup_interval_secs: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        let defaults = StreamConfig::default();
        Self {
            flush_window_ms: defaults.flush_window_ms,
            max_buffered_parts: defaults.max_buffered_parts,
            poll_interval_ms: defaults.poll_interval_ms,
            retention_secs: defaults.retention.as_secs(),
            cleanup_interval_secs: 60,
        }
    }
}

impl From<StreamSettings> for StreamConfig {
    fn from(settings: StreamSettings) -> Self {
        StreamConfig::new()
            .with_flush_window_ms(settings.flush_window_ms)
            .with_max_buffered_parts(settings.max_buffered_parts)
            .with_poll_interval_ms(settings.poll_interval_ms)
            .with_retention(Duration::from_secs(settings.retention_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `json` or `pretty`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables: `STRAND_<SECTION>__<KEY>`, e.g. `STRAND_SERVER__PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("STRAND")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        // Secrets come from ENV only
        cfg.mongodb_uri = std::env::var("MONGODB_URI").ok().filter(|uri| !uri.is_empty());

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}
