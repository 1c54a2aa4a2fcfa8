//! # Utility Functions
//!
//! Convenience helpers shared across the event system.

use crate::system::EventBus;
use std::sync::Arc;

/// Returns the current Unix timestamp in seconds.
///
/// All durable-player timestamp fields (`last_event`) use this
/// representation; event headers carry full RFC 3339 timestamps instead.
pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Creates a new shared event bus instance.
///
/// The returned bus is fully initialized and ready to accept handler
/// registrations and event emissions.
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::new())
}
