//! Session lifecycle service.
//!
//! Sits between the event handlers and the raw store: applies the bot
//! policy, keeps sessions synchronized with RCON `status` ground truth,
//! and reconstructs sessions after ordering races or a daemon restart so
//! private messaging keeps working (eventual consistency).

use crate::error::{CoreError, CoreResult};
use crate::rcon::RconService;
use crate::repository::{PlayerRepository, ServerRepository};
use crate::resolver::PlayerResolver;
use crate::steam::normalize_steam_id;
use super::store::{PlayerSession, SessionStore, SessionUpdate};
use chrono::Utc;
use scorekeep_event_system::{PlayerId, ServerId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Input for creating a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub server_id: ServerId,
    pub game_user_id: u32,
    pub player_id: PlayerId,
    pub steam_id: String,
    pub player_name: String,
    pub is_bot: bool,
}

/// Options for [`SessionService::synchronize_server_sessions`].
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Drop all existing sessions for the server before the sweep.
    pub clear_existing: bool,
    /// Honor the server's `IgnoreBots` config flag; when suppressed, bots
    /// are always included.
    pub respect_ignore_bots: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { clear_existing: true, respect_ignore_bots: true }
    }
}

/// Result of one synchronization sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOutcome {
    pub created: usize,
    pub skipped_bots: usize,
    pub errors: usize,
}

pub struct SessionService {
    store: Arc<SessionStore>,
    resolver: Arc<PlayerResolver>,
    rcon: Arc<dyn RconService>,
    servers: Arc<dyn ServerRepository>,
    players: Arc<dyn PlayerRepository>,
}

impl SessionService {
    pub fn new(
        store: Arc<SessionStore>,
        resolver: Arc<PlayerResolver>,
        rcon: Arc<dyn RconService>,
        servers: Arc<dyn ServerRepository>,
        players: Arc<dyn PlayerRepository>,
    ) -> Self {
        Self { store, resolver, rcon, servers, players }
    }

    /// Inserts a new session. Fails if the `(server, gameUserId)` slot is
    /// already live.
    pub fn create_session(&self, new_session: NewSession) -> CoreResult<PlayerSession> {
        let now = Utc::now();
        let session = PlayerSession {
            server_id: new_session.server_id,
            game_user_id: new_session.game_user_id,
            player_id: new_session.player_id,
            steam_id: new_session.steam_id,
            player_name: new_session.player_name,
            is_bot: new_session.is_bot,
            connected_at: now,
            last_seen: now,
        };
        self.store.insert(session.clone())?;
        Ok(session)
    }

    /// Merges partial fields and bumps `last_seen`; `None` if the slot is
    /// not live.
    pub fn update_session(
        &self,
        server_id: ServerId,
        game_user_id: u32,
        update: SessionUpdate,
    ) -> Option<PlayerSession> {
        self.store.update(server_id, game_user_id, update)
    }

    /// Removes a session; returns whether one existed.
    pub fn remove_session(&self, server_id: ServerId, game_user_id: u32) -> bool {
        self.store.remove(server_id, game_user_id).is_some()
    }

    pub fn get_session_by_game_user_id(
        &self,
        server_id: ServerId,
        game_user_id: u32,
    ) -> Option<PlayerSession> {
        self.store.get_by_game_user_id(server_id, game_user_id)
    }

    pub fn get_session_by_player_id(
        &self,
        server_id: ServerId,
        player_id: PlayerId,
    ) -> Option<PlayerSession> {
        self.store.get_by_player_id(server_id, player_id)
    }

    pub fn get_session_by_steam_id(
        &self,
        server_id: ServerId,
        steam_id: &str,
    ) -> Option<PlayerSession> {
        self.store.get_by_steam_id(server_id, steam_id)
    }

    /// Drops every session for a server; used on connection loss and
    /// before a full resync.
    pub fn clear_server_sessions(&self, server_id: ServerId) -> usize {
        self.store.clear_server(server_id)
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Rebuilds the server's session set from a live `status` sweep.
    ///
    /// Per-player failures are counted and logged but never abort the
    /// sweep.
    pub async fn synchronize_server_sessions(
        &self,
        server_id: ServerId,
        options: SyncOptions,
    ) -> CoreResult<SyncOutcome> {
        let ignore_bots = if options.respect_ignore_bots {
            match self.servers.get_config_bool(server_id, "IgnoreBots", true).await {
                Ok(value) => value,
                Err(err) => {
                    warn!("Failed to read IgnoreBots for server {}: {}", server_id, err);
                    true
                }
            }
        } else {
            false
        };

        if options.clear_existing {
            let cleared = self.store.clear_server(server_id);
            if cleared > 0 {
                debug!("Cleared {} sessions on server {} before sync", cleared, server_id);
            }
        }

        self.ensure_connected(server_id).await?;
        let status = self.rcon.get_status(server_id).await?;
        let game = self.servers.get_server_game(server_id).await?;

        let mut outcome = SyncOutcome::default();
        for player in &status.player_list {
            if ignore_bots && player.is_bot {
                outcome.skipped_bots += 1;
                continue;
            }
            let created = async {
                let player_id = self
                    .resolver
                    .get_or_create_player(&player.uniqueid, &player.name, &game, Some(server_id))
                    .await?;
                self.create_session(NewSession {
                    server_id,
                    game_user_id: player.userid,
                    player_id,
                    steam_id: player.uniqueid.clone(),
                    player_name: player.name.clone(),
                    is_bot: player.is_bot,
                })
            }
            .await;

            match created {
                Ok(_) => outcome.created += 1,
                Err(err) => {
                    warn!(
                        "Failed to sync player {:?} on server {}: {}",
                        player.name, server_id, err
                    );
                    outcome.errors += 1;
                }
            }
        }

        info!(
            "🔄 Synchronized server {}: {} created, {} bots skipped, {} errors",
            server_id, outcome.created, outcome.skipped_bots, outcome.errors
        );
        Ok(outcome)
    }

    /// Reconstructs a session for a durable player from the live `status`
    /// list.
    ///
    /// Used when a handler references a player that has no session: an
    /// action arrived before its connect was materialized, or the daemon
    /// restarted with players already connected. Matches the player's
    /// unique ids first, then the display name; returns `None` with a
    /// warning if nothing on the server matches.
    pub async fn fallback_create_session(
        &self,
        server_id: ServerId,
        player_id: PlayerId,
    ) -> CoreResult<Option<PlayerSession>> {
        let Some(player) = self.players.find_by_id(player_id).await? else {
            warn!("Fallback session requested for unknown player {}", player_id);
            return Ok(None);
        };

        self.ensure_connected(server_id).await?;
        let status = self.rcon.get_status(server_id).await?;

        let matched = status
            .player_list
            .iter()
            .find(|p| {
                player.unique_ids.iter().any(|u| {
                    u.unique_id == p.uniqueid
                        || normalize_steam_id(&p.uniqueid)
                            .map(|normalized| normalized == u.unique_id)
                            .unwrap_or(false)
                })
            })
            .or_else(|| status.player_list.iter().find(|p| p.name == player.last_name));

        let Some(slot) = matched else {
            warn!(
                "No live slot matches player {} ({}) on server {}",
                player_id, player.last_name, server_id
            );
            return Ok(None);
        };

        let session = self.create_session(NewSession {
            server_id,
            game_user_id: slot.userid,
            player_id,
            steam_id: slot.uniqueid.clone(),
            player_name: slot.name.clone(),
            is_bot: slot.is_bot,
        })?;
        info!(
            "🔄 Recovered session for player {} on server {} (slot {})",
            player_id, server_id, slot.userid
        );
        Ok(Some(session))
    }

    /// Maps durable players to their live game slots, filtering bots.
    /// Missing entries go through fallback session creation.
    pub async fn convert_to_game_user_ids(
        &self,
        server_id: ServerId,
        player_ids: &[PlayerId],
    ) -> Vec<(PlayerId, u32)> {
        let mut out = Vec::new();
        for &player_id in player_ids {
            let session = match self.store.get_by_player_id(server_id, player_id) {
                Some(session) => Some(session),
                None => match self.fallback_create_session(server_id, player_id).await {
                    Ok(session) => session,
                    Err(err) => {
                        warn!(
                            "Fallback session failed for player {} on server {}: {}",
                            player_id, server_id, err
                        );
                        None
                    }
                },
            };
            if let Some(session) = session {
                if !session.is_bot {
                    out.push((player_id, session.game_user_id));
                }
            }
        }
        out
    }

    /// Whether a private message can be delivered to the player right now:
    /// a live non-bot session exists, possibly reconstructed on the spot.
    pub async fn can_send_private_message(
        &self,
        server_id: ServerId,
        player_id: PlayerId,
    ) -> bool {
        if let Some(session) = self.store.get_by_player_id(server_id, player_id) {
            return !session.is_bot;
        }
        match self.fallback_create_session(server_id, player_id).await {
            Ok(Some(session)) => !session.is_bot,
            Ok(None) => false,
            Err(err) => {
                warn!(
                    "Private-message check failed for player {} on server {}: {}",
                    player_id, server_id, err
                );
                false
            }
        }
    }

    async fn ensure_connected(&self, server_id: ServerId) -> CoreResult<()> {
        if self.rcon.is_connected(server_id).await {
            return Ok(());
        }
        self.rcon
            .connect(server_id)
            .await
            .map_err(|err| CoreError::rcon(format!("connect to server {server_id}: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryPlayerRepository, InMemoryServerRepository, StaticRconService};
    use crate::rcon::{RconPlayer, RconStatus};
    use crate::repository::NewPlayer;

    fn rcon_player(userid: u32, uniqueid: &str, name: &str, is_bot: bool) -> RconPlayer {
        RconPlayer {
            name: name.to_string(),
            userid,
            uniqueid: uniqueid.to_string(),
            is_bot,
            frag: 0,
            ping: 20,
            loss: 0,
            address: None,
        }
    }

    fn status_with(players: Vec<RconPlayer>) -> RconStatus {
        RconStatus {
            map: Some("de_dust2".to_string()),
            players: players.len() as u32,
            max_players: 16,
            uptime_secs: Some(3600),
            fps: Some(128.0),
            timestamp: Utc::now(),
            player_list: players,
        }
    }

    struct Fixture {
        players: Arc<InMemoryPlayerRepository>,
        servers: Arc<InMemoryServerRepository>,
        rcon: Arc<StaticRconService>,
        service: SessionService,
    }

    fn fixture() -> Fixture {
        let players = Arc::new(InMemoryPlayerRepository::new());
        let servers = Arc::new(InMemoryServerRepository::new());
        servers.add_server(ServerId(1), "test", "cstrike");
        let rcon = Arc::new(StaticRconService::new());
        let resolver = Arc::new(PlayerResolver::new(players.clone()));
        let service = SessionService::new(
            Arc::new(SessionStore::new()),
            resolver,
            rcon.clone(),
            servers.clone(),
            players.clone(),
        );
        Fixture { players, servers, rcon, service }
    }

    #[tokio::test]
    async fn test_sync_skips_bots_by_default() {
        let f = fixture();
        f.rcon.set_status(
            ServerId(1),
            status_with(vec![
                rcon_player(5, "STEAM_0:1:99999", "Real", false),
                rcon_player(6, "BOT", "Expert", true),
            ]),
        );

        let outcome = f
            .service
            .synchronize_server_sessions(ServerId(1), SyncOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.skipped_bots, 1);
        assert_eq!(outcome.errors, 0);
        assert!(f.service.get_session_by_game_user_id(ServerId(1), 5).is_some());
        assert!(f.service.get_session_by_game_user_id(ServerId(1), 6).is_none());
    }

    #[tokio::test]
    async fn test_sync_with_ignore_bots_suppressed() {
        let f = fixture();
        f.rcon.set_status(
            ServerId(1),
            status_with(vec![
                rcon_player(5, "BOT", "Expert", true),
                rcon_player(6, "BOT", "Hard", true),
            ]),
        );

        let outcome = f
            .service
            .synchronize_server_sessions(
                ServerId(1),
                SyncOptions { clear_existing: true, respect_ignore_bots: false },
            )
            .await
            .unwrap();

        assert_eq!(outcome.created, 2);
        // Two bots with the same raw id resolve to distinct players.
        let a = f.service.get_session_by_game_user_id(ServerId(1), 5).unwrap();
        let b = f.service.get_session_by_game_user_id(ServerId(1), 6).unwrap();
        assert_ne!(a.player_id, b.player_id);
        assert_eq!(a.steam_id, "BOT");
    }

    #[tokio::test]
    async fn test_sync_replaces_existing_sessions() {
        let f = fixture();
        f.rcon.set_status(
            ServerId(1),
            status_with(vec![rcon_player(5, "STEAM_0:1:99999", "Real", false)]),
        );
        f.service
            .synchronize_server_sessions(ServerId(1), SyncOptions::default())
            .await
            .unwrap();

        // Next sweep reports a different roster.
        f.rcon.set_status(
            ServerId(1),
            status_with(vec![rcon_player(9, "STEAM_0:0:12345", "Other", false)]),
        );
        f.service
            .synchronize_server_sessions(ServerId(1), SyncOptions::default())
            .await
            .unwrap();

        assert!(f.service.get_session_by_game_user_id(ServerId(1), 5).is_none());
        assert!(f.service.get_session_by_game_user_id(ServerId(1), 9).is_some());
    }

    #[tokio::test]
    async fn test_fallback_session_on_private_message() {
        let f = fixture();
        let player_id = f
            .players
            .upsert_player(NewPlayer {
                last_name: "FallbackPlayer".to_string(),
                game: "cstrike".to_string(),
                unique_id: normalize_steam_id("STEAM_0:1:99999").unwrap(),
            })
            .await
            .unwrap();
        f.rcon.set_status(
            ServerId(1),
            status_with(vec![rcon_player(5, "STEAM_0:1:99999", "FallbackPlayer", false)]),
        );

        assert!(f.service.can_send_private_message(ServerId(1), player_id).await);
        let session = f.service.get_session_by_player_id(ServerId(1), player_id).unwrap();
        assert_eq!(session.game_user_id, 5);
    }

    #[tokio::test]
    async fn test_fallback_matches_by_name_for_bots() {
        let f = fixture();
        let player_id = f
            .players
            .upsert_player(NewPlayer {
                last_name: "Expert".to_string(),
                game: "cstrike".to_string(),
                unique_id: "BOT_1_Expert".to_string(),
            })
            .await
            .unwrap();
        f.rcon
            .set_status(ServerId(1), status_with(vec![rcon_player(7, "BOT", "Expert", true)]));

        let session = f
            .service
            .fallback_create_session(ServerId(1), player_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.game_user_id, 7);
        assert!(session.is_bot);

        // But bots never qualify for private messages.
        assert!(!f.service.can_send_private_message(ServerId(1), player_id).await);
    }

    #[tokio::test]
    async fn test_fallback_without_matching_slot() {
        let f = fixture();
        let player_id = f
            .players
            .upsert_player(NewPlayer {
                last_name: "Ghost".to_string(),
                game: "cstrike".to_string(),
                unique_id: "76561197960265729".to_string(),
            })
            .await
            .unwrap();
        f.rcon.set_status(ServerId(1), status_with(vec![]));

        let session = f.service.fallback_create_session(ServerId(1), player_id).await.unwrap();
        assert!(session.is_none());
        assert!(!f.service.can_send_private_message(ServerId(1), player_id).await);
    }

    #[tokio::test]
    async fn test_convert_to_game_user_ids_filters_bots() {
        let f = fixture();
        f.rcon.set_status(
            ServerId(1),
            status_with(vec![
                rcon_player(5, "STEAM_0:1:99999", "Real", false),
                rcon_player(6, "BOT", "Expert", true),
            ]),
        );
        let outcome = f
            .service
            .synchronize_server_sessions(
                ServerId(1),
                SyncOptions { clear_existing: true, respect_ignore_bots: false },
            )
            .await
            .unwrap();
        assert_eq!(outcome.created, 2);

        let real = f.service.get_session_by_game_user_id(ServerId(1), 5).unwrap();
        let bot = f.service.get_session_by_game_user_id(ServerId(1), 6).unwrap();

        let converted = f
            .service
            .convert_to_game_user_ids(ServerId(1), &[real.player_id, bot.player_id])
            .await;
        assert_eq!(converted, vec![(real.player_id, 5)]);
    }
}
