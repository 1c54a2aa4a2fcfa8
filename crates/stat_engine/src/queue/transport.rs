//! Message transport contract and the in-process channel implementation.

use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use scorekeep_event_system::GameEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// One delivery: an opaque payload plus the tag used to ack/nack it.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub delivery_id: u64,
    pub payload: Vec<u8>,
}

/// Durable message transport the consumer pulls from.
///
/// Delivery is at-least-once: a negative acknowledgement requeues the
/// message, a dead-letter removes it permanently.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Next message, or `None` once the transport is closed and drained.
    async fn receive(&self) -> CoreResult<Option<QueueMessage>>;

    async fn ack(&self, delivery_id: u64) -> CoreResult<()>;

    /// Requeue for redelivery.
    async fn nack(&self, delivery_id: u64) -> CoreResult<()>;

    /// Remove permanently, recording why.
    async fn dead_letter(&self, delivery_id: u64, reason: &str) -> CoreResult<()>;
}

/// In-process transport over an unbounded channel, with real
/// redelivery/dead-letter bookkeeping. Used by tests and by embedded
/// setups that feed events from the same process.
pub struct ChannelTransport {
    tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    pending: Mutex<HashMap<u64, Vec<u8>>>,
    next_delivery: AtomicU64,
    acked: AtomicU64,
    redelivered: AtomicU64,
    dead: Mutex<Vec<(Vec<u8>, String)>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            pending: Mutex::new(HashMap::new()),
            next_delivery: AtomicU64::new(0),
            acked: AtomicU64::new(0),
            redelivered: AtomicU64::new(0),
            dead: Mutex::new(Vec::new()),
        }
    }

    pub fn publish(&self, payload: Vec<u8>) {
        if let Some(tx) = self.tx.lock().unwrap().as_ref() {
            let _ = tx.send(payload);
        }
    }

    pub fn publish_event(&self, event: &GameEvent) -> CoreResult<()> {
        self.publish(event.to_json()?);
        Ok(())
    }

    /// Closes the publishing side; `receive` returns `None` once drained.
    pub fn close(&self) {
        self.tx.lock().unwrap().take();
    }

    pub fn acked_count(&self) -> u64 {
        self.acked.load(Ordering::SeqCst)
    }

    pub fn redelivered_count(&self) -> u64 {
        self.redelivered.load(Ordering::SeqCst)
    }

    pub fn dead_letters(&self) -> Vec<(Vec<u8>, String)> {
        self.dead.lock().unwrap().clone()
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageTransport for ChannelTransport {
    async fn receive(&self) -> CoreResult<Option<QueueMessage>> {
        let payload = { self.rx.lock().await.recv().await };
        Ok(payload.map(|payload| {
            let delivery_id = self.next_delivery.fetch_add(1, Ordering::SeqCst);
            self.pending.lock().unwrap().insert(delivery_id, payload.clone());
            QueueMessage { delivery_id, payload }
        }))
    }

    async fn ack(&self, delivery_id: u64) -> CoreResult<()> {
        self.pending.lock().unwrap().remove(&delivery_id);
        self.acked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn nack(&self, delivery_id: u64) -> CoreResult<()> {
        let payload = self
            .pending
            .lock()
            .unwrap()
            .remove(&delivery_id)
            .ok_or_else(|| CoreError::queue(format!("unknown delivery {delivery_id}")))?;
        self.redelivered.fetch_add(1, Ordering::SeqCst);
        self.publish(payload);
        Ok(())
    }

    async fn dead_letter(&self, delivery_id: u64, reason: &str) -> CoreResult<()> {
        let payload = self
            .pending
            .lock()
            .unwrap()
            .remove(&delivery_id)
            .ok_or_else(|| CoreError::queue(format!("unknown delivery {delivery_id}")))?;
        self.dead.lock().unwrap().push((payload, reason.to_string()));
        Ok(())
    }
}
