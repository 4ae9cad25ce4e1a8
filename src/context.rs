use std::sync::Arc;

use crate::broadcast::BroadcastHub;
use crate::storage::LogStorage;

/// Process-wide state, built once at startup and cloned into each component
#[derive(Clone)]
pub struct AppContext {
    pub storage: Arc<dyn LogStorage>,
    pub hub: Arc<BroadcastHub>,
    /// Rows returned per table by the recent-logs query
    pub recent_limit: u32,
}

impl AppContext {
    pub fn new(storage: Arc<dyn LogStorage>, hub: Arc<BroadcastHub>, recent_limit: u32) -> Self {
        Self {
            storage,
            hub,
            recent_limit,
        }
    }
}
