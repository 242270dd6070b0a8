//! Application state shared by all handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::service::SynthesisService;

/// Shared application state for the HTTP server.
///
/// Cheap to clone; every handler invocation gets its own copy of the `Arc`s.
/// The service needs no lock: admission control lives inside it.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub service: Arc<SynthesisService>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let service = SynthesisService::from_config(&config);
        AppState {
            config: Arc::new(config),
            service: Arc::new(service),
        }
    }
}
