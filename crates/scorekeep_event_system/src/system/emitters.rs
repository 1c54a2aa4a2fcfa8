/// Event emission methods
use crate::events::{EventType, FailureKind, GameEvent, HandlerFailure};
use super::core::EventBus;
use tracing::{debug, error};

/// Outcome of one emit call: which handlers ran and which failed.
///
/// The bus never re-raises handler failures; callers that need to react
/// (the queue consumer's ack/nack decision) inspect this instead.
#[derive(Debug, Clone)]
pub struct EmitOutcome {
    pub event_type: EventType,
    /// Number of handlers invoked.
    pub invoked: usize,
    /// Failing handlers as (handler id, structured failure).
    pub failures: Vec<(String, HandlerFailure)>,
}

impl EmitOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn has_transient_failure(&self) -> bool {
        self.failures.iter().any(|(_, f)| f.kind == FailureKind::Transient)
    }

    pub fn has_validation_failure(&self) -> bool {
        self.failures.iter().any(|(_, f)| f.kind == FailureKind::Validation)
    }
}

impl EventBus {
    /// Dispatches an event to every handler registered for its type.
    ///
    /// Handlers run in descending priority, then registration order, one at
    /// a time: each is awaited to completion before the next is invoked, so
    /// handlers of a single emit never interleave. Different events may be
    /// emitted concurrently from separate tasks.
    ///
    /// A failing handler does not abort its siblings; the failure is logged,
    /// counted, and reported in the returned [`EmitOutcome`].
    pub async fn emit(&self, event: &GameEvent) -> EmitOutcome {
        let event_type = event.event_type();

        // Snapshot under the shard guard, then run without holding any lock.
        let snapshot = self
            .handlers
            .get(&event_type)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        if snapshot.is_empty() {
            debug!("No handlers registered for {}, skipping", event_type);
            let mut stats = self.stats.write().await;
            stats.events_emitted += 1;
            return EmitOutcome { event_type, invoked: 0, failures: Vec::new() };
        }

        let mut failures = Vec::new();
        for registered in &snapshot {
            let result = registered.handler.handle(event).await;
            if !result.success {
                let failure = result.error.unwrap_or(HandlerFailure {
                    message: "handler reported failure without detail".to_string(),
                    kind: FailureKind::Transient,
                });
                error!(
                    "❌ Handler {} failed for {}: {}",
                    registered.id, event_type, failure.message
                );
                failures.push((registered.id.clone(), failure));
            }
        }

        let mut stats = self.stats.write().await;
        stats.events_emitted += 1;
        stats.handler_errors += failures.len() as u64;

        EmitOutcome {
            event_type,
            invoked: snapshot.len(),
            failures,
        }
    }
}
