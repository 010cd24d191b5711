use std::sync::Arc;

use db::DBService;
use services::services::config::Config;
use tokio::sync::RwLock;

pub mod error;
pub mod http;
pub mod routes;

/// Shared handler state: the database connection and the runtime config.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    config: Arc<RwLock<Config>>,
}

impl AppState {
    pub fn new(db: DBService, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(RwLock::new(config)),
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.config
    }
}
