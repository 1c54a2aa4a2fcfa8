//! # Scorekeep Event System
//!
//! Typed event taxonomy and in-process event bus for the Scorekeep
//! game-server telemetry daemon.
//!
//! ## Core Features
//!
//! - **Type Safety**: the event set is a closed tagged union; handlers
//!   branch by variant instead of downcasting
//! - **Async/Await Support**: built on Tokio; handlers may suspend on I/O
//! - **Priority Scheduling**: handlers declare a numeric priority; within a
//!   single emit they run highest-first, sequentially
//! - **Failure Isolation**: a failing handler never aborts its siblings and
//!   never propagates out of `emit`
//! - **Monitoring**: cumulative emit/error counters plus a per-type handler
//!   breakdown
//!
//! ## Quick Start Example
//!
//! ```rust,no_run
//! use scorekeep_event_system::*;
//! use chrono::Utc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = create_event_bus();
//!
//!     bus.on_fn(EventType::PlayerConnect, "log_connects", |event| {
//!         println!("connect on server {}", event.server_id);
//!         HandlerResult::ok()
//!     })
//!     .await;
//!
//!     let event = GameEvent::new(
//!         ServerId(1),
//!         Utc::now(),
//!         EventData::PlayerConnect(ConnectData { game_user_id: 10, ip_address: None }),
//!     );
//!     let outcome = bus.emit(&event).await;
//!     assert!(outcome.all_succeeded());
//! }
//! ```

pub mod events;
pub mod system;
pub mod types;
pub mod utils;

pub use events::{
    ActionPlayerData, ActionPlayerPlayerData, ActionTeamData, ChangeNameData, ChangeRoleData,
    ChangeTeamData, ChatData, ConnectData, DamageData, DisconnectData, EntryData, EventData,
    EventError, EventHandler, EventMeta, EventType, FailureKind, FnEventHandler, GameEvent,
    HandlerFailure, HandlerResult, KillData, RoundEndData, RoundStartData,
    ServerAuthenticatedData, SuicideData, TeamkillData, WeaponFireData, WeaponHitData,
    is_valid_correlation_id, is_valid_event_id,
};
pub use system::{DetailedEventBusStats, EmitOutcome, EventBus, EventBusStats};
pub use types::{PlayerId, Position, ServerId};
pub use utils::{create_event_bus, current_timestamp};
