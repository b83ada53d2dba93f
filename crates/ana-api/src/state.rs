//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use ana_chat::ChatOrchestrator;
use ana_core::config::AnaConfig;

/// Shared application state, passed to handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AnaConfig>,
    pub orchestrator: Arc<ChatOrchestrator>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: AnaConfig, orchestrator: ChatOrchestrator) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            start_time: Instant::now(),
        }
    }
}
