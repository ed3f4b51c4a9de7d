//! Application state for gateway service.

use std::sync::Arc;
use std::time::Duration;

use gateway_common::config::AppConfig;
use gateway_common::middleware::SecurityState;

use crate::proxy::BackendRoutes;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub security: SecurityState,
    pub routes: Arc<BackendRoutes>,
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let security = SecurityState::from_config(&config.security)?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()?;

        Ok(Self {
            routes: Arc::new(BackendRoutes::from_service_urls(&config.services)),
            config: Arc::new(config),
            security,
            http_client,
        })
    }
}
