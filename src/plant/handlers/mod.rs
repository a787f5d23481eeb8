pub mod analytics;
pub mod data;
pub mod recommendations;
pub mod ws;

use std::sync::Arc;

use cement_plant::{ConnectionRegistry, IdGenerator, PlantOrchestrator};

/// Shared by every handler through an `Extension` layer
pub struct AppState {
    pub orchestrator: Arc<PlantOrchestrator>,
    pub registry: Arc<ConnectionRegistry>,
    /// Request ids for error payloads and logs
    pub ids: Arc<dyn IdGenerator>,
    pub subscriber_buffer: usize,
}
