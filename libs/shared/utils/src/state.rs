use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::DocumentStore;

/// Shared handler state: configuration plus the store handle built in `main`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            store,
        })
    }
}
