use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use strand_api::{build_router, config::Config, state::AppState};
use strand_persist::PersistClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting Strand API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let mut builder = PersistClient::builder()
        .ledger_config(config.ledger.clone().into())
        .stream_config(config.streams.clone().into());
    match &config.mongodb_uri {
        Some(uri) => {
            tracing::info!("Connecting to MongoDB");
            builder = builder.mongodb_uri(uri).database(&config.storage.database);
        }
        None => tracing::warn!("MONGODB_URI not set, keeping the ledger in memory"),
    }
    let persist = builder.build().await?;

    spawn_cleanup(persist.clone(), config.streams.cleanup_interval_secs);

    let state = Arc::new(AppState::new(config.clone(), persist));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drop terminal streams past their retention
fn spawn_cleanup(persist: PersistClient, every_secs: u64) {
    if every_secs == 0 {
        return;
    }
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(every_secs));
        loop {
            ticker.tick().await;
            if let Err(e) = persist.deltas().cleanup_expired().await {
                tracing::error!("Stream cleanup failed: {}", e);
            }
        }
    });
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        }
        _ => {
            registry.with(tracing_subscriber::fmt::layer().pretty()).init();
        }
    }
}
