//! Outbound game-server notifications: the structured command grammar and
//! the event-gated dispatcher.

mod command;
mod dispatcher;

pub use command::{CommandBuilder, EngineKind, BROADCAST_TARGET};
pub use dispatcher::NotificationDispatcher;

use scorekeep_event_system::EventType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Per-server notification configuration, cached by the dispatcher with a
/// TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub engine: EngineKind,
    pub color_enabled: bool,
    /// Event types notifications are enabled for; `None` means all.
    pub event_types: Option<HashSet<EventType>>,
    /// Per-event message format overrides, keyed by event tag.
    pub message_formats: HashMap<String, String>,
    /// The command prefix the game-side plugin listens on.
    pub command_prefix: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Source,
            color_enabled: false,
            event_types: None,
            message_formats: HashMap::new(),
            command_prefix: "hlx_event".to_string(),
        }
    }
}

impl NotificationConfig {
    /// Whether notifications for an event type are enabled.
    pub fn is_enabled(&self, event_type: EventType) -> bool {
        self.event_types
            .as_ref()
            .map(|set| set.contains(&event_type))
            .unwrap_or(true)
    }
}
