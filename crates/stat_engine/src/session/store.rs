//! In-memory session store.
//!
//! The store owns every live session exclusively; handlers receive clones.
//! Three indices are kept consistent under a single per-server entry:
//! game slot, durable player id, and steam id. Mutations never suspend, so
//! no guard is ever held across an await point.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use scorekeep_event_system::{PlayerId, ServerId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// A live connection on a specific server.
///
/// `steam_id` is the identity exactly as the server reports it (`"BOT"`
/// for bots); the durable identity lives behind `player_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSession {
    pub server_id: ServerId,
    pub game_user_id: u32,
    pub player_id: PlayerId,
    pub steam_id: String,
    pub player_name: String,
    pub is_bot: bool,
    pub connected_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl PlayerSession {
    /// Seconds between connect and last observed activity.
    pub fn duration_secs(&self) -> i64 {
        (self.last_seen - self.connected_at).num_seconds().max(0)
    }
}

/// Partial update applied by [`SessionStore::update`]. `last_seen` is
/// always bumped.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub player_name: Option<String>,
}

#[derive(Debug, Default)]
struct ServerSessions {
    by_game_user_id: HashMap<u32, PlayerSession>,
    /// Secondary indices point at the slot owning the session.
    by_player_id: HashMap<PlayerId, u32>,
    by_steam_id: HashMap<String, u32>,
}

impl ServerSessions {
    fn remove_slot(&mut self, game_user_id: u32) -> Option<PlayerSession> {
        let session = self.by_game_user_id.remove(&game_user_id)?;
        self.by_player_id.remove(&session.player_id);
        if !session.is_bot {
            self.by_steam_id.remove(&session.steam_id);
        }
        Some(session)
    }
}

/// The authoritative view of who is currently on each server.
pub struct SessionStore {
    servers: DashMap<ServerId, ServerSessions>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self { servers: DashMap::new() }
    }

    /// Inserts a session into all three indices atomically.
    ///
    /// Fails if the `(server, gameUserId)` slot is already live. A stale
    /// session holding the same durable player or (for real players) the
    /// same steam id is evicted first, keeping the uniqueness invariants.
    pub fn insert(&self, session: PlayerSession) -> CoreResult<()> {
        let mut entry = self.servers.entry(session.server_id).or_default();

        if entry.by_game_user_id.contains_key(&session.game_user_id) {
            return Err(CoreError::validation(format!(
                "session already exists for server {} slot {}",
                session.server_id, session.game_user_id
            )));
        }

        if let Some(slot) = entry.by_player_id.get(&session.player_id).copied() {
            warn!(
                "Replacing stale session for player {} on server {} (slot {} -> {})",
                session.player_id, session.server_id, slot, session.game_user_id
            );
            entry.remove_slot(slot);
        }
        if !session.is_bot {
            if let Some(slot) = entry.by_steam_id.get(&session.steam_id).copied() {
                warn!(
                    "Replacing stale session for steam id {} on server {} (slot {} -> {})",
                    session.steam_id, session.server_id, slot, session.game_user_id
                );
                entry.remove_slot(slot);
            }
        }

        entry.by_player_id.insert(session.player_id, session.game_user_id);
        // Bots all share the literal "BOT" id; only real players get the
        // steam index.
        if !session.is_bot {
            entry.by_steam_id.insert(session.steam_id.clone(), session.game_user_id);
        }
        entry.by_game_user_id.insert(session.game_user_id, session);
        Ok(())
    }

    /// Merges partial fields into a live session and bumps `last_seen`.
    /// Returns the updated session, or `None` if the slot is not live.
    pub fn update(
        &self,
        server_id: ServerId,
        game_user_id: u32,
        update: SessionUpdate,
    ) -> Option<PlayerSession> {
        let mut entry = self.servers.get_mut(&server_id)?;
        let session = entry.by_game_user_id.get_mut(&game_user_id)?;
        if let Some(name) = update.player_name {
            session.player_name = name;
        }
        session.last_seen = Utc::now().max(session.connected_at);
        Some(session.clone())
    }

    /// Bumps `last_seen` only. Returns whether the slot was live.
    pub fn touch(&self, server_id: ServerId, game_user_id: u32) -> bool {
        self.update(server_id, game_user_id, SessionUpdate::default()).is_some()
    }

    /// Removes a session from all three indices. Returns it if it existed.
    pub fn remove(&self, server_id: ServerId, game_user_id: u32) -> Option<PlayerSession> {
        self.servers.get_mut(&server_id)?.remove_slot(game_user_id)
    }

    pub fn get_by_game_user_id(
        &self,
        server_id: ServerId,
        game_user_id: u32,
    ) -> Option<PlayerSession> {
        self.servers
            .get(&server_id)?
            .by_game_user_id
            .get(&game_user_id)
            .cloned()
    }

    pub fn get_by_player_id(&self, server_id: ServerId, player_id: PlayerId) -> Option<PlayerSession> {
        let entry = self.servers.get(&server_id)?;
        let slot = entry.by_player_id.get(&player_id)?;
        entry.by_game_user_id.get(slot).cloned()
    }

    pub fn get_by_steam_id(&self, server_id: ServerId, steam_id: &str) -> Option<PlayerSession> {
        let entry = self.servers.get(&server_id)?;
        let slot = entry.by_steam_id.get(steam_id)?;
        entry.by_game_user_id.get(slot).cloned()
    }

    /// Drops every session for a server. Returns how many were removed.
    pub fn clear_server(&self, server_id: ServerId) -> usize {
        self.servers
            .remove(&server_id)
            .map(|(_, sessions)| sessions.by_game_user_id.len())
            .unwrap_or(0)
    }

    /// Snapshot of all live sessions on a server.
    pub fn server_sessions(&self, server_id: ServerId) -> Vec<PlayerSession> {
        self.servers
            .get(&server_id)
            .map(|entry| entry.by_game_user_id.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Total live sessions across all servers.
    pub fn session_count(&self) -> usize {
        self.servers.iter().map(|entry| entry.by_game_user_id.len()).sum()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
