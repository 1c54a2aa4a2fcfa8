//! RCON client contract.
//!
//! The transport itself (GoldSrc/Source wire protocol, credentials,
//! timeouts) lives outside the core; handlers and the session service only
//! depend on this trait. Implementations keep one connection per server,
//! acquired on demand and torn down by the monitor on repeated failure.

use crate::error::CoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scorekeep_event_system::ServerId;
use serde::{Deserialize, Serialize};

/// One row of a parsed `status` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RconPlayer {
    pub name: String,
    /// Game-issued slot number.
    pub userid: u32,
    /// Raw identity as the game reports it; `"BOT"` for every bot.
    pub uniqueid: String,
    pub is_bot: bool,
    pub frag: i32,
    pub ping: u32,
    pub loss: u32,
    pub address: Option<String>,
}

/// A parsed `status` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RconStatus {
    pub map: Option<String>,
    pub players: u32,
    pub max_players: u32,
    pub uptime_secs: Option<u64>,
    pub fps: Option<f32>,
    pub timestamp: DateTime<Utc>,
    pub player_list: Vec<RconPlayer>,
}

impl RconStatus {
    /// An empty status snapshot taken now.
    pub fn empty() -> Self {
        Self {
            map: None,
            players: 0,
            max_players: 0,
            uptime_secs: None,
            fps: None,
            timestamp: Utc::now(),
            player_list: Vec::new(),
        }
    }
}

/// Request/response channel to game servers.
#[async_trait]
pub trait RconService: Send + Sync {
    async fn is_connected(&self, server_id: ServerId) -> bool;

    async fn connect(&self, server_id: ServerId) -> CoreResult<()>;

    async fn disconnect(&self, server_id: ServerId) -> CoreResult<()>;

    /// Issues `status` and parses the live player list.
    async fn get_status(&self, server_id: ServerId) -> CoreResult<RconStatus>;

    /// Sends a raw command, returning the server's textual response.
    async fn execute_command(&self, server_id: ServerId, raw: &str) -> CoreResult<String>;
}
