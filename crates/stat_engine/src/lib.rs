//! # Stat Engine
//!
//! The processing core of the Scorekeep telemetry daemon: everything
//! between the queue transport and the persistence/RCON boundaries.
//!
//! ## Components
//!
//! * [`queue`] - transport contract, idempotent consumer, per-server
//!   ordered dispatch
//! * [`session`] - the live session store and its lifecycle service
//! * [`resolver`] - raw game identities to durable players, with request
//!   coalescing
//! * [`handlers`] - per-event-type domain logic
//! * [`notify`] - event-gated RCON notifications
//! * [`rcon`] - client contract, retry backoff, connection monitor
//! * [`repository`] - persistence contracts consumed by everything above
//! * [`memory`] - in-memory collaborator implementations for standalone
//!   runs and tests
//!
//! ## Data flow
//!
//! ```text
//! queue message → consumer → bus (or queue-direct) → handler
//!                                        │
//!                  ┌─────────────────────┼─────────────────────┐
//!              repository          session service         notifier
//! ```
//!
//! The RCON monitor runs independently, feeding the session service with
//! ground-truth player lists for fallback session reconstruction.

pub mod error;
pub mod handlers;
pub mod memory;
pub mod notify;
pub mod queue;
pub mod ranking;
pub mod rcon;
pub mod repository;
pub mod resolver;
pub mod session;
pub mod steam;


pub use error::{CoreError, CoreResult};
pub use handlers::{direct_handlers, register_bus_handlers, HandlerDeps};
pub use notify::{NotificationConfig, NotificationDispatcher};
pub use queue::{ChannelTransport, MessageTransport, QueueConsumer, UdpTransport};
pub use ranking::{BasicRankingService, KillContext, RankingService, SkillAdjustment};
pub use rcon::{BackoffConfig, MonitorConfig, RconMonitor, RconService, RetryBackoff};
pub use repository::{PlayerRecord, PlayerRepository, PlayerStatsUpdate, ServerRepository};
pub use resolver::PlayerResolver;
pub use session::{PlayerSession, SessionService, SessionStore, SyncOptions};
