use std::sync::Arc;

use pointrake_core::SqliteSheetStore;

use crate::config::ServerConfig;

/// Application state shared across all requests.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteSheetStore>,
    pub config: ServerConfig,
}

impl AppState {
    pub async fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let store = SqliteSheetStore::open(&config.db_path).await?;
        Ok(Self {
            store: Arc::new(store),
            config,
        })
    }

    /// In-memory state for tests.
    pub async fn new_in_memory() -> anyhow::Result<Self> {
        let store = SqliteSheetStore::open_memory().await?;
        Ok(Self {
            store: Arc::new(store),
            config: ServerConfig::default(),
        })
    }
}
