/// Handler removal and bookkeeping
use crate::events::EventType;
use super::core::EventBus;
use tracing::{info, warn};

impl EventBus {
    /// Removes a previously registered handler by id.
    ///
    /// Unknown ids are a no-op: a warning is logged and `false` returned.
    pub async fn off(&self, handler_id: &str) -> bool {
        let Some((_, event_type)) = self.ids.remove(handler_id) else {
            warn!("⚠️ off() called with unknown handler id {}", handler_id);
            return false;
        };

        let mut removed = false;
        if let Some(mut entry) = self.handlers.get_mut(&event_type) {
            let before = entry.len();
            entry.retain(|h| h.id != handler_id);
            removed = entry.len() < before;
        }

        if removed {
            let mut stats = self.stats.write().await;
            stats.total_handlers = stats.total_handlers.saturating_sub(1);
            info!("🗑️ Removed handler {}", handler_id);
        }
        removed
    }

    /// Removes all handlers, globally or for one event type. Returns the
    /// number removed.
    pub async fn clear_handlers(&self, event_type: Option<EventType>) -> usize {
        let mut removed = 0;
        match event_type {
            Some(event_type) => {
                if let Some((_, list)) = self.handlers.remove(&event_type) {
                    removed = list.len();
                    for h in &list {
                        self.ids.remove(&h.id);
                    }
                }
            }
            None => {
                for entry in self.handlers.iter() {
                    removed += entry.value().len();
                }
                self.handlers.clear();
                self.ids.clear();
            }
        }

        if removed > 0 {
            let mut stats = self.stats.write().await;
            stats.total_handlers = stats.total_handlers.saturating_sub(removed);
            info!("🗑️ Cleared {} handlers", removed);
        }
        removed
    }

    /// Checks whether any handler is registered for an event type.
    #[inline]
    pub fn has_handlers(&self, event_type: EventType) -> bool {
        self.handlers
            .get(&event_type)
            .map(|entry| !entry.value().is_empty())
            .unwrap_or(false)
    }

    /// Gets the number of handlers for an event type.
    #[inline]
    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.handlers
            .get(&event_type)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Gets all event types with at least one registered handler.
    pub fn registered_types(&self) -> Vec<EventType> {
        self.handlers
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| *entry.key())
            .collect()
    }
}
