//! Durable-delivery bridge: transport contract, idempotency cache, and the
//! consumer that feeds the bus (or the queue-direct handlers).

mod consumer;
mod dedupe;
mod transport;
mod udp;

pub use consumer::{ConsumerStats, QueueConsumer};
pub use dedupe::DedupeCache;
pub use transport::{ChannelTransport, MessageTransport, QueueMessage};
pub use udp::UdpTransport;
