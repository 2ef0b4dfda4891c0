use std::sync::Arc;

use crate::{config::AppConfig, repository::Repositories};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repos: Repositories,
}

impl AppState {
    pub fn new(config: AppConfig, repos: Repositories) -> Self {
        Self {
            config: Arc::new(config),
            repos,
        }
    }
}
