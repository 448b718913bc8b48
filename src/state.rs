use std::sync::Arc;
use crate::config::Config;
use crate::services::EntityStore;

/// Application context shared by every handler. Built once at startup and
/// owned by the router.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
