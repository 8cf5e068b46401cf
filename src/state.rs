use std::sync::Arc;

use crate::config::AppConfig;
use crate::storage::{MemoryStorage, Storage};

/// Shared handles cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub config: Arc<AppConfig>,
    /// Outbound client for the identity provider's token endpoint.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, config: AppConfig) -> Self {
        Self {
            storage,
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }

    /// In-memory state with default configuration.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(Arc::new(MemoryStorage::new()), config)
    }
}
