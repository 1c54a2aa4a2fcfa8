/// Handler registration methods
use crate::events::{EventHandler, EventType, FnEventHandler, GameEvent, HandlerResult};
use super::core::{EventBus, RegisteredHandler};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

impl EventBus {
    /// Registers a handler for an event type with the default priority (0).
    ///
    /// Returns an opaque, collision-free handler id of the form
    /// `<EVENT_TYPE>_<monotonic>_<random>`, accepted by
    /// [`EventBus::off`](super::EventBus::off) for later removal.
    pub async fn on(&self, event_type: EventType, handler: Arc<dyn EventHandler>) -> String {
        self.on_with_priority(event_type, 0, handler).await
    }

    /// Registers a handler with an explicit priority. Higher priorities run
    /// first within an emit; handlers of equal priority run in registration
    /// order.
    pub async fn on_with_priority(
        &self,
        event_type: EventType,
        priority: i32,
        handler: Arc<dyn EventHandler>,
    ) -> String {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let random = uuid::Uuid::new_v4().simple().to_string();
        let id = format!("{}_{}_{}", event_type.wire_name(), seq, &random[..8]);

        let registered = RegisteredHandler {
            id: id.clone(),
            priority,
            seq,
            handler,
        };

        {
            let mut entry = self.handlers.entry(event_type).or_default();
            entry.push(registered);
            // Sorted at insert so the emit path only snapshots.
            entry.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
        }
        self.ids.insert(id.clone(), event_type);

        let mut stats = self.stats.write().await;
        stats.total_handlers += 1;

        info!("📝 Registered handler {} (priority {})", id, priority);
        id
    }

    /// Convenience wrapper registering a synchronous closure.
    pub async fn on_fn<F>(&self, event_type: EventType, name: &str, f: F) -> String
    where
        F: Fn(&GameEvent) -> HandlerResult + Send + Sync + 'static,
    {
        self.on(event_type, Arc::new(FnEventHandler::new(name, f))).await
    }

    /// Closure registration with an explicit priority.
    pub async fn on_fn_with_priority<F>(
        &self,
        event_type: EventType,
        priority: i32,
        name: &str,
        f: F,
    ) -> String
    where
        F: Fn(&GameEvent) -> HandlerResult + Send + Sync + 'static,
    {
        self.on_with_priority(event_type, priority, Arc::new(FnEventHandler::new(name, f)))
            .await
    }
}
