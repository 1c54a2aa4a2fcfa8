//! UDP transport: queue messages as JSON datagrams.
//!
//! Datagrams are fire-and-forget, so acknowledgement is a no-op and
//! negative acknowledgement cannot redeliver; a transiently failing event
//! arriving over UDP is simply lost, which matches the lossy ingest
//! contract of game-server log streams.

use crate::error::{CoreError, CoreResult};
use super::transport::{MessageTransport, QueueMessage};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

const MAX_DATAGRAM: usize = 64 * 1024;

pub struct UdpTransport {
    socket: UdpSocket,
    next_delivery: AtomicU64,
}

impl UdpTransport {
    pub async fn bind(addr: &str) -> CoreResult<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|err| CoreError::queue(format!("bind {addr}: {err}")))?;
        info!("📡 Listening for queue messages on udp://{}", addr);
        Ok(Self {
            socket,
            next_delivery: AtomicU64::new(0),
        })
    }

    pub fn local_addr(&self) -> CoreResult<std::net::SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|err| CoreError::queue(err.to_string()))
    }
}

#[async_trait]
impl MessageTransport for UdpTransport {
    async fn receive(&self) -> CoreResult<Option<QueueMessage>> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (len, peer) = self
            .socket
            .recv_from(&mut buf)
            .await
            .map_err(|err| CoreError::queue(format!("recv: {err}")))?;
        buf.truncate(len);
        debug!("Received {} byte datagram from {}", len, peer);
        Ok(Some(QueueMessage {
            delivery_id: self.next_delivery.fetch_add(1, Ordering::SeqCst),
            payload: buf,
        }))
    }

    async fn ack(&self, _delivery_id: u64) -> CoreResult<()> {
        Ok(())
    }

    async fn nack(&self, delivery_id: u64) -> CoreResult<()> {
        debug!("Cannot redeliver datagram {}, dropping", delivery_id);
        Ok(())
    }

    async fn dead_letter(&self, delivery_id: u64, reason: &str) -> CoreResult<()> {
        warn!("Dead-lettering datagram {}: {}", delivery_id, reason);
        Ok(())
    }
}
