/// Core EventBus implementation
use crate::events::{EventHandler, EventType};
use super::stats::{DetailedEventBusStats, EventBusStats};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The in-process event bus at the center of event processing.
///
/// Handlers register per [`EventType`] with an optional priority; emission
/// dispatches to all handlers of the event's type, highest priority first,
/// one at a time. Uses DashMap for lock-free concurrent access to the
/// handler table, so concurrent emits of *different* events never contend
/// on a global lock.
pub struct EventBus {
    /// Handler lists per event type, kept sorted by (priority desc, seq asc).
    pub(super) handlers: DashMap<EventType, Vec<RegisteredHandler>>,
    /// Reverse index handler-id → event type for O(1) removal.
    pub(super) ids: DashMap<String, EventType>,
    /// Cumulative counters (kept as RwLock for atomic multi-field updates).
    pub(super) stats: RwLock<EventBusStats>,
    /// Monotonic part of generated handler ids; also the registration order.
    pub(super) next_seq: AtomicU64,
}

/// A handler plus its registration metadata.
#[derive(Clone)]
pub(super) struct RegisteredHandler {
    pub(super) id: String,
    pub(super) priority: i32,
    pub(super) seq: u64,
    pub(super) handler: Arc<dyn EventHandler>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("registered_types", &self.handlers.len())
            .finish()
    }
}

impl EventBus {
    /// Creates a new event bus with no registered handlers.
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            ids: DashMap::new(),
            stats: RwLock::new(EventBusStats::default()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Gets the current bus statistics.
    #[inline]
    pub async fn get_stats(&self) -> EventBusStats {
        self.stats.read().await.clone()
    }

    /// Gets statistics including the per-event-type handler breakdown.
    pub async fn get_detailed_stats(&self) -> DetailedEventBusStats {
        let mut handlers_by_type = HashMap::new();
        for entry in self.handlers.iter() {
            if !entry.value().is_empty() {
                handlers_by_type.insert(entry.key().wire_name().to_string(), entry.value().len());
            }
        }
        DetailedEventBusStats {
            base: self.stats.read().await.clone(),
            handlers_by_type,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
