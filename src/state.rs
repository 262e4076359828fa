use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Usage threshold at which catalog entries can no longer be deleted
    pub fn delete_threshold(&self) -> u64 {
        self.config.catalog.delete_threshold
    }

    /// Quality score assigned to contributed catalog entries
    pub fn default_quality_score(&self) -> i32 {
        self.config.catalog.default_quality_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn state_exposes_catalog_policy() {
        let db = crate::db::connect_in_memory().await.unwrap();
        let mut config = Config::default();
        config.catalog.delete_threshold = 3;

        let state = AppState::new(db, config);
        assert_eq!(state.delete_threshold(), 3);
        assert_eq!(state.default_quality_score(), 70);
    }
}
