use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use strand_types::PaginationOpts;

use crate::{error::ApiResult, state::AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: HashMap<String, String>,
}

/// Health check endpoint
///
/// Returns the health status of the API and its storage
pub async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<Json<HealthResponse>> {
    let mut services = HashMap::new();

    let ledger = match check_ledger(&state).await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::warn!("Ledger health check failed: {}", e);
            "disconnected"
        }
    };
    services.insert("ledger".to_string(), ledger.to_string());

    Ok(Json(HealthResponse {
        status: if ledger == "connected" { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services,
    }))
}

async fn check_ledger(state: &AppState) -> strand_persist::Result<()> {
    // Lightweight read against the thread index
    state
        .persist
        .ledger()
        .list_threads_by_user("_health_check", PaginationOpts::first(1))
        .await?;
    Ok(())
}
