/// Statistics tracking for the event bus
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Core event bus statistics for monitoring
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EventBusStats {
    /// Total number of registered event handlers
    pub total_handlers: usize,
    /// Total number of events emitted since bus creation
    pub events_emitted: u64,
    /// Total number of failed handler invocations (one per failing handler)
    pub handler_errors: u64,
}

/// Detailed statistics including the per-type handler breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedEventBusStats {
    /// Base bus statistics
    pub base: EventBusStats,
    /// Handler count keyed by event type wire name
    pub handlers_by_type: HashMap<String, usize>,
}
