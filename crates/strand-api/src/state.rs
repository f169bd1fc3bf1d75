use std::sync::Arc;

use strand_persist::PersistClient;

use crate::config::Config;

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub persist: PersistClient,
}

impl AppState {
    pub fn new(config: Config, persist: PersistClient) -> Self {
        Self {
            config: Arc::new(config),
            persist,
        }
    }
}
