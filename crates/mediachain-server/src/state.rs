use std::sync::Arc;

use mediachain::{Config, MediachainError, WorkflowEngine};

/// Shared state managed by Rocket.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<WorkflowEngine>,
}

impl AppState {
    pub fn new(engine: WorkflowEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, MediachainError> {
        Ok(Self::new(WorkflowEngine::from_config(config)?))
    }
}
