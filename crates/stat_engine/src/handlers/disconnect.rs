//! Disconnect handler: session teardown, connection-time accounting, and
//! the mismatched-session and bot-resolution edge cases.

use crate::error::CoreResult;
use crate::repository::{DisconnectEventRow, PlayerStatsUpdate};
use crate::session::PlayerSession;
use crate::steam::{bot_unique_id, is_bot_id, normalize_steam_id, sanitize_player_name};
use super::{unexpected_variant, HandlerDeps};
use async_trait::async_trait;
use scorekeep_event_system::{
    DisconnectData, EventData, EventHandler, GameEvent, HandlerResult, PlayerId,
};
use tracing::{debug, info, warn};

pub struct DisconnectHandler {
    deps: HandlerDeps,
}

/// Who is disconnecting, resolved from the session store or reconstructed
/// from durable records.
struct DisconnectSubject {
    player_id: PlayerId,
    player_name: String,
    /// Session duration in seconds; zero when no session was live.
    duration: i64,
    /// Slot to remove after persistence, if the session is still indexed.
    remove_slot: Option<u32>,
}

impl DisconnectHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    /// Finds the live session for the disconnect, cleaning up a stale slot
    /// if the game disconnected with a reused `gameUserId`.
    fn locate_session(&self, event: &GameEvent, data: &DisconnectData) -> Option<PlayerSession> {
        let server_id = event.server_id;
        if let Some(session) = self
            .deps
            .sessions
            .get_session_by_game_user_id(server_id, data.game_user_id)
        {
            return Some(session);
        }

        // The game sometimes disconnects with a stale slot after a
        // reconnect; fall back to the steam id.
        let steam_id = event.meta.as_ref().and_then(|m| m.steam_id.as_deref())?;
        let stale = self.deps.sessions.get_session_by_steam_id(server_id, steam_id)?;
        if stale.game_user_id != data.game_user_id {
            self.deps.sessions.remove_session(server_id, stale.game_user_id);
            info!(
                "🧹 Cleaned up mismatched session: steam id {} was on slot {}, disconnect says {}",
                steam_id, stale.game_user_id, data.game_user_id
            );
        }
        Some(stale)
    }

    /// Resolves a disconnect with no live session from durable records.
    /// Returns `None` when nothing matches, which is the signal to skip.
    async fn resolve_without_session(
        &self,
        event: &GameEvent,
    ) -> CoreResult<Option<DisconnectSubject>> {
        let Some(meta) = event.meta.as_ref() else {
            return Ok(None);
        };
        let (Some(steam_id), Some(player_name)) =
            (meta.steam_id.as_deref(), meta.player_name.as_deref())
        else {
            return Ok(None);
        };

        let game = self.deps.servers.get_server_game(event.server_id).await?;
        let is_bot = meta.is_bot || is_bot_id(steam_id);
        let unique_id = if is_bot {
            bot_unique_id(event.server_id, &sanitize_player_name(player_name)?)
        } else {
            match normalize_steam_id(steam_id) {
                Ok(id) => id,
                Err(_) => return Ok(None),
            }
        };

        let Some(player) = self.deps.players.find_by_unique_id(&unique_id, &game).await? else {
            return Ok(None);
        };
        if is_bot {
            info!("Resolved bot {} to player {}", player_name, player.player_id);
        }
        Ok(Some(DisconnectSubject {
            player_id: player.player_id,
            player_name: player_name.to_string(),
            duration: 0,
            remove_slot: None,
        }))
    }

    async fn process(&self, event: &GameEvent, data: &DisconnectData) -> CoreResult<u64> {
        let server_id = event.server_id;

        let subject = match self.locate_session(event, data) {
            Some(session) => DisconnectSubject {
                player_id: session.player_id,
                player_name: session.player_name.clone(),
                duration: session.duration_secs(),
                remove_slot: Some(session.game_user_id),
            },
            None => match self.resolve_without_session(event).await? {
                Some(subject) => subject,
                None => {
                    debug!(
                        "Skipping disconnect processing for slot {} on server {}: no session, no durable match",
                        data.game_user_id, server_id
                    );
                    return Ok(0);
                }
            },
        };

        self.deps
            .players
            .create_disconnect_event(DisconnectEventRow {
                server_id,
                player_id: subject.player_id,
                event_time: event.timestamp,
                reason: data.reason.clone(),
                session_duration: subject.duration,
            })
            .await?;

        // Best-effort: stamp the matching connect row with the disconnect
        // time.
        if let Err(err) = self
            .deps
            .players
            .close_recent_connect(server_id, subject.player_id, event.timestamp)
            .await
        {
            warn!(
                "Failed to backfill connect row for player {}: {}",
                subject.player_id, err
            );
        }

        self.deps
            .players
            .update(
                subject.player_id,
                PlayerStatsUpdate {
                    connection_time: subject.duration,
                    last_event: Some(event.timestamp.timestamp()),
                    ..Default::default()
                },
            )
            .await?;

        if let Some(slot) = subject.remove_slot {
            self.deps.sessions.remove_session(server_id, slot);
        }

        self.deps
            .notifier
            .notify_disconnect_event(
                server_id,
                &subject.player_name,
                data.reason.as_deref(),
                None,
                subject.duration,
            )
            .await;
        Ok(2)
    }
}

#[async_trait]
impl EventHandler for DisconnectHandler {
    async fn handle(&self, event: &GameEvent) -> HandlerResult {
        let EventData::PlayerDisconnect(data) = &event.data else {
            return unexpected_variant(self.name(), event);
        };
        match self.process(event, data).await {
            Ok(affected) => HandlerResult::ok_with(affected),
            Err(err) => err.to_handler_result(),
        }
    }

    fn name(&self) -> &str {
        "disconnect"
    }
}
