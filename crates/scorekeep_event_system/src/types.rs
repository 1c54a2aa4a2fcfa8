//! # Core Type Definitions
//!
//! Fundamental identifier types shared by the event taxonomy, the event bus,
//! and the processing core.
//!
//! ## Design Principles
//!
//! - **Type Safety**: Wrapper types prevent ID confusion (ServerId vs PlayerId)
//! - **Serialization**: All types support JSON serialization for queue transport
//! - **Performance**: Plain integers inside, cheap to copy and compare

use serde::{Deserialize, Serialize};

/// Durable key of a game server known to the daemon.
///
/// Issued by the persistence layer; stable across restarts of both the
/// daemon and the game server itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServerId(pub i64);

impl std::fmt::Display for ServerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The persistence layer's integer primary key for a player.
///
/// Durable across connections and servers; monotonic and never reused.
/// Not to be confused with the per-server, per-connection game slot
/// (`gameUserId`), which is a plain `u32` in event payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub i64);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 3D world position attached to some combat events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}
