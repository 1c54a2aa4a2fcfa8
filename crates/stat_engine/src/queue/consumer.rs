//! Queue consumer: deserializes deliveries, enforces per-server ordering,
//! short-circuits duplicates, and decides ack/nack/dead-letter from the
//! handler outcomes.
//!
//! Ordering: deliveries are partitioned by `serverId` onto single-consumer
//! workers, so events of one server are processed in arrival order while
//! different servers proceed in parallel. Cross-server ordering is not
//! guaranteed.
//!
//! Routing: most event types go through the bus. The high-volume types
//! (`PLAYER_KILL`, `WEAPON_FIRE`, `WEAPON_HIT`) are queue-direct: never
//! registered on the bus, dispatched straight to their handler here.

use crate::queue::dedupe::DedupeCache;
use crate::queue::transport::MessageTransport;
use scorekeep_event_system::{
    is_valid_event_id, EventBus, EventHandler, EventType, FailureKind, GameEvent,
};
use scorekeep_event_system::ServerId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Cumulative consumer counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsumerStats {
    pub received: u64,
    pub acked: u64,
    pub nacked: u64,
    pub dead_lettered: u64,
    pub duplicates: u64,
}

#[derive(Default)]
struct Counters {
    received: AtomicU64,
    acked: AtomicU64,
    nacked: AtomicU64,
    dead_lettered: AtomicU64,
    duplicates: AtomicU64,
}

enum Decision {
    Ack,
    Nack,
    DeadLetter(String),
}

pub struct QueueConsumer {
    bus: Arc<EventBus>,
    transport: Arc<dyn MessageTransport>,
    direct: HashMap<EventType, Arc<dyn EventHandler>>,
    dedupe: DedupeCache,
    counters: Counters,
}

impl QueueConsumer {
    pub fn new(
        bus: Arc<EventBus>,
        transport: Arc<dyn MessageTransport>,
        dedupe_capacity: usize,
    ) -> Self {
        Self {
            bus,
            transport,
            direct: HashMap::new(),
            dedupe: DedupeCache::new(dedupe_capacity),
            counters: Counters::default(),
        }
    }

    /// Registers a queue-direct handler. Only meaningful for the
    /// queue-direct event types; anything else is refused with a warning
    /// since it already flows through the bus.
    pub fn register_direct(&mut self, event_type: EventType, handler: Arc<dyn EventHandler>) {
        if !event_type.is_queue_direct() {
            warn!(
                "Refusing direct registration for bus-routed event type {}",
                event_type
            );
            return;
        }
        self.direct.insert(event_type, handler);
    }

    pub fn stats(&self) -> ConsumerStats {
        ConsumerStats {
            received: self.counters.received.load(Ordering::SeqCst),
            acked: self.counters.acked.load(Ordering::SeqCst),
            nacked: self.counters.nacked.load(Ordering::SeqCst),
            dead_lettered: self.counters.dead_lettered.load(Ordering::SeqCst),
            duplicates: self.counters.duplicates.load(Ordering::SeqCst),
        }
    }

    /// Consumes until the transport drains or shutdown is signalled.
    /// Partition workers drain their backlog before the call returns.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut partitions: HashMap<ServerId, mpsc::UnboundedSender<(u64, GameEvent)>> =
            HashMap::new();
        let mut workers = Vec::new();

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Queue consumer shutting down");
                        break;
                    }
                }
                received = self.transport.receive() => {
                    match received {
                        Ok(Some(message)) => {
                            self.counters.received.fetch_add(1, Ordering::SeqCst);
                            match GameEvent::from_json(&message.payload) {
                                Ok(event) => {
                                    let sender = partitions
                                        .entry(event.server_id)
                                        .or_insert_with(|| {
                                            let (tx, handle) = self.spawn_worker(event.server_id);
                                            workers.push(handle);
                                            tx
                                        });
                                    let _ = sender.send((message.delivery_id, event));
                                }
                                Err(err) => {
                                    warn!("Undecodable queue message: {}", err);
                                    self.counters.dead_lettered.fetch_add(1, Ordering::SeqCst);
                                    if let Err(err) = self
                                        .transport
                                        .dead_letter(message.delivery_id, &err.to_string())
                                        .await
                                    {
                                        warn!("Failed to dead-letter: {}", err);
                                    }
                                }
                            }
                        }
                        Ok(None) => {
                            debug!("Transport drained, stopping consumer");
                            break;
                        }
                        Err(err) => {
                            warn!("Transport receive failed: {}", err);
                            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                        }
                    }
                }
            }
        }

        // Closing the senders lets workers finish their backlog.
        drop(partitions);
        for worker in workers {
            let _ = worker.await;
        }
    }

    fn spawn_worker(
        self: &Arc<Self>,
        server_id: ServerId,
    ) -> (
        mpsc::UnboundedSender<(u64, GameEvent)>,
        tokio::task::JoinHandle<()>,
    ) {
        debug!("Starting partition worker for server {}", server_id);
        let consumer = Arc::clone(self);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            while let Some((delivery_id, event)) = rx.recv().await {
                consumer.process_one(delivery_id, event).await;
            }
        });
        (tx, handle)
    }

    async fn process_one(&self, delivery_id: u64, event: GameEvent) {
        // Idempotency: a valid id that already completed is acknowledged
        // without reprocessing. Ids are recorded only on success so a
        // nacked redelivery is not mistaken for a duplicate.
        let dedupe_id = event.event_id.as_deref().filter(|id| {
            let valid = is_valid_event_id(id);
            if !valid {
                warn!("Event id {:?} does not match the expected format, ignoring", id);
            }
            valid
        });
        if let Some(id) = dedupe_id {
            if self.dedupe.contains(id) {
                debug!("Duplicate event {} short-circuited", id);
                self.counters.duplicates.fetch_add(1, Ordering::SeqCst);
                self.finish(delivery_id, Decision::Ack).await;
                return;
            }
        }

        let event_type = event.event_type();
        let decision = if event_type.is_queue_direct() {
            match self.direct.get(&event_type) {
                Some(handler) => {
                    let result = handler.handle(&event).await;
                    match result.error {
                        None => Decision::Ack,
                        Some(failure) if failure.kind == FailureKind::Transient => {
                            Decision::Nack
                        }
                        Some(failure) => Decision::DeadLetter(failure.message),
                    }
                }
                None => {
                    debug!("No direct handler for {}, acknowledging", event_type);
                    Decision::Ack
                }
            }
        } else {
            let outcome = self.bus.emit(&event).await;
            if outcome.has_transient_failure() {
                Decision::Nack
            } else if outcome.has_validation_failure() {
                let reasons: Vec<String> = outcome
                    .failures
                    .iter()
                    .map(|(_, f)| f.message.clone())
                    .collect();
                Decision::DeadLetter(reasons.join("; "))
            } else {
                Decision::Ack
            }
        };

        if matches!(decision, Decision::Ack) {
            if let Some(id) = dedupe_id {
                self.dedupe.record(id);
            }
        }
        self.finish(delivery_id, decision).await;
    }

    async fn finish(&self, delivery_id: u64, decision: Decision) {
        let result = match decision {
            Decision::Ack => {
                self.counters.acked.fetch_add(1, Ordering::SeqCst);
                self.transport.ack(delivery_id).await
            }
            Decision::Nack => {
                self.counters.nacked.fetch_add(1, Ordering::SeqCst);
                self.transport.nack(delivery_id).await
            }
            Decision::DeadLetter(reason) => {
                self.counters.dead_lettered.fetch_add(1, Ordering::SeqCst);
                self.transport.dead_letter(delivery_id, &reason).await
            }
        };
        if let Err(err) = result {
            warn!("Transport settle failed for delivery {}: {}", delivery_id, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::transport::ChannelTransport;
    use chrono::Utc;
    use scorekeep_event_system::{
        ChatData, EventData, FnEventHandler, HandlerResult, KillData,
    };
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;
    use std::time::Duration;

    fn chat_event(server: i64, message: &str) -> GameEvent {
        GameEvent::new(
            ServerId(server),
            Utc::now(),
            EventData::ChatMessage(ChatData {
                game_user_id: 1,
                message: message.to_string(),
                message_mode: 0,
            }),
        )
    }

    fn kill_event(server: i64) -> GameEvent {
        GameEvent::new(
            ServerId(server),
            Utc::now(),
            EventData::PlayerKill(KillData {
                killer_game_user_id: 10,
                victim_game_user_id: 20,
                weapon: "ak47".to_string(),
                headshot: false,
                killer_team: None,
                victim_team: None,
                killer_position: None,
                victim_position: None,
            }),
        )
    }

    struct Running {
        transport: Arc<ChannelTransport>,
        consumer: Arc<QueueConsumer>,
        handle: tokio::task::JoinHandle<()>,
        shutdown: watch::Sender<bool>,
    }

    fn start(consumer: QueueConsumer, transport: Arc<ChannelTransport>) -> Running {
        let consumer = Arc::new(consumer);
        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(Arc::clone(&consumer).run(rx));
        Running { transport, consumer, handle, shutdown }
    }

    impl Running {
        /// Closes the transport and waits for the consumer to drain.
        async fn drain(self) -> Arc<QueueConsumer> {
            self.transport.close();
            let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
            drop(self.shutdown);
            self.consumer
        }
    }

    #[tokio::test]
    async fn test_bus_routed_event_is_acked() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = seen.clone();
        bus.on_fn(EventType::ChatMessage, "count", move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
            HandlerResult::ok()
        })
        .await;

        let transport = Arc::new(ChannelTransport::new());
        transport.publish_event(&chat_event(1, "hello")).unwrap();

        let running = start(
            QueueConsumer::new(bus, transport.clone(), 64),
            transport.clone(),
        );
        let consumer = running.drain().await;

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(consumer.stats().acked, 1);
        assert_eq!(transport.acked_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_event_id_short_circuits() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = seen.clone();
        bus.on_fn(EventType::ChatMessage, "count", move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
            HandlerResult::ok()
        })
        .await;

        let transport = Arc::new(ChannelTransport::new());
        let event = chat_event(1, "hello").with_event_id("msg_abc123_0123456789abcdef");
        transport.publish_event(&event).unwrap();
        transport.publish_event(&event).unwrap();

        let running = start(
            QueueConsumer::new(bus, transport.clone(), 64),
            transport.clone(),
        );
        let consumer = running.drain().await;

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        let stats = consumer.stats();
        assert_eq!(stats.duplicates, 1);
        // Both deliveries were acknowledged.
        assert_eq!(stats.acked, 2);
    }

    #[tokio::test]
    async fn test_transient_failure_is_redelivered() {
        let bus = Arc::new(EventBus::new());
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        bus.on_fn(EventType::ChatMessage, "flaky", move |_| {
            if attempts_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                HandlerResult::failed(FailureKind::Transient, "db hiccup")
            } else {
                HandlerResult::ok()
            }
        })
        .await;

        let transport = Arc::new(ChannelTransport::new());
        transport
            .publish_event(&chat_event(1, "retry me").with_event_id("msg_retry1_0123456789abcdef"))
            .unwrap();

        let running = start(
            QueueConsumer::new(bus, transport.clone(), 64),
            transport.clone(),
        );
        // Let the first attempt fail and the redelivery land before closing.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let consumer = running.drain().await;

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        let stats = consumer.stats();
        assert_eq!(stats.nacked, 1);
        assert_eq!(stats.acked, 1);
        assert_eq!(transport.redelivered_count(), 1);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_dead_lettered() {
        let bus = Arc::new(EventBus::new());
        bus.on_fn(EventType::ChatMessage, "rejecting", |_| {
            HandlerResult::failed(FailureKind::Validation, "bad payload")
        })
        .await;

        let transport = Arc::new(ChannelTransport::new());
        transport.publish_event(&chat_event(1, "nope")).unwrap();

        let running = start(
            QueueConsumer::new(bus, transport.clone(), 64),
            transport.clone(),
        );
        let consumer = running.drain().await;

        assert_eq!(consumer.stats().dead_lettered, 1);
        let dead = transport.dead_letters();
        assert_eq!(dead.len(), 1);
        assert!(dead[0].1.contains("bad payload"));
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_dead_lettered() {
        let bus = Arc::new(EventBus::new());
        let transport = Arc::new(ChannelTransport::new());
        transport.publish(b"not json at all".to_vec());

        let running = start(
            QueueConsumer::new(bus, transport.clone(), 64),
            transport.clone(),
        );
        let consumer = running.drain().await;

        assert_eq!(consumer.stats().dead_lettered, 1);
        assert_eq!(transport.dead_letters().len(), 1);
    }

    #[tokio::test]
    async fn test_queue_direct_bypasses_bus() {
        let bus = Arc::new(EventBus::new());
        let direct_hits = Arc::new(AtomicU32::new(0));
        let direct_hits_clone = direct_hits.clone();

        let transport = Arc::new(ChannelTransport::new());
        let mut consumer = QueueConsumer::new(bus.clone(), transport.clone(), 64);
        consumer.register_direct(
            EventType::PlayerKill,
            Arc::new(FnEventHandler::new("direct_kill", move |_| {
                direct_hits_clone.fetch_add(1, Ordering::SeqCst);
                HandlerResult::ok()
            })),
        );

        transport.publish_event(&kill_event(1)).unwrap();
        let running = start(consumer, transport.clone());
        let consumer = running.drain().await;

        assert_eq!(direct_hits.load(Ordering::SeqCst), 1);
        assert_eq!(consumer.stats().acked, 1);
        // Kill events never touch the bus.
        assert!(!bus.has_handlers(EventType::PlayerKill));
        assert_eq!(bus.get_stats().await.events_emitted, 0);
    }

    #[tokio::test]
    async fn test_direct_registration_refused_for_bus_types() {
        let bus = Arc::new(EventBus::new());
        let transport = Arc::new(ChannelTransport::new());
        let mut consumer = QueueConsumer::new(bus, transport, 64);
        consumer.register_direct(
            EventType::ChatMessage,
            Arc::new(FnEventHandler::new("misplaced", |_| HandlerResult::ok())),
        );
        assert!(consumer.direct.is_empty());
    }

    #[tokio::test]
    async fn test_per_server_ordering_is_preserved() {
        let bus = Arc::new(EventBus::new());
        let order = Arc::new(Mutex::new(Vec::new()));
        let order_clone = order.clone();
        bus.on_fn(EventType::ChatMessage, "record", move |event| {
            if let EventData::ChatMessage(data) = &event.data {
                order_clone.lock().unwrap().push(data.message.clone());
            }
            HandlerResult::ok()
        })
        .await;

        let transport = Arc::new(ChannelTransport::new());
        for i in 0..20 {
            transport.publish_event(&chat_event(1, &format!("s1-{i}"))).unwrap();
            transport.publish_event(&chat_event(2, &format!("s2-{i}"))).unwrap();
        }

        let running = start(
            QueueConsumer::new(bus, transport.clone(), 64),
            transport.clone(),
        );
        running.drain().await;

        let recorded = order.lock().unwrap().clone();
        let server1: Vec<&String> = recorded.iter().filter(|m| m.starts_with("s1-")).collect();
        let server2: Vec<&String> = recorded.iter().filter(|m| m.starts_with("s2-")).collect();
        let expected1: Vec<String> = (0..20).map(|i| format!("s1-{i}")).collect();
        let expected2: Vec<String> = (0..20).map(|i| format!("s2-{i}")).collect();
        assert_eq!(server1, expected1.iter().collect::<Vec<_>>());
        assert_eq!(server2, expected2.iter().collect::<Vec<_>>());
    }
}
