//! Application state for the study server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::service::StudyService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// All study operations
    service: Arc<StudyService>,
}

impl AppState {
    /// Create application state with real collaborators
    pub fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing study assistant state...");

        let service = Arc::new(StudyService::from_config(&config)?);
        tracing::info!(
            "Embedding model {} ({} dims), generator {}",
            service.gateway().model(),
            service.gateway().dimensions(),
            service.generator().model()
        );

        Ok(Self::with_service(config, service))
    }

    /// Create application state around an existing service
    pub fn with_service(config: RagConfig, service: Arc<StudyService>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, service }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the study service
    pub fn service(&self) -> &StudyService {
        &self.inner.service
    }
}
