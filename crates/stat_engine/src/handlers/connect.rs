//! Connect handler: resolves the player, creates the session, and records
//! the connect event.

use crate::error::CoreResult;
use crate::session::NewSession;
use crate::steam::is_bot_id;
use crate::repository::{ConnectEventRow, PlayerStatsUpdate};
use super::{unexpected_variant, HandlerDeps};
use async_trait::async_trait;
use scorekeep_event_system::{
    ConnectData, EventData, EventHandler, FailureKind, GameEvent, HandlerResult,
};
use tracing::debug;

pub struct ConnectHandler {
    deps: HandlerDeps,
}

impl ConnectHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    async fn process(
        &self,
        event: &GameEvent,
        data: &ConnectData,
        steam_id: &str,
        player_name: &str,
        meta_is_bot: bool,
    ) -> CoreResult<u64> {
        let server_id = event.server_id;
        let game = self.deps.servers.get_server_game(server_id).await?;
        let player_id = self
            .deps
            .resolver
            .get_or_create_player(steam_id, player_name, &game, Some(server_id))
            .await?;

        // The game reused the slot without a disconnect; drop the old
        // session before inserting the new one.
        if self
            .deps
            .sessions
            .get_session_by_game_user_id(server_id, data.game_user_id)
            .is_some()
        {
            debug!(
                "Slot {} on server {} reused, removing previous session",
                data.game_user_id, server_id
            );
            self.deps.sessions.remove_session(server_id, data.game_user_id);
        }

        self.deps.sessions.create_session(NewSession {
            server_id,
            game_user_id: data.game_user_id,
            player_id,
            steam_id: steam_id.to_string(),
            player_name: player_name.to_string(),
            is_bot: meta_is_bot || is_bot_id(steam_id),
        })?;

        self.deps
            .players
            .create_connect_event(ConnectEventRow {
                server_id,
                player_id,
                event_time: event.timestamp,
                ip_address: data.ip_address.clone(),
            })
            .await?;

        self.deps
            .players
            .update(
                player_id,
                PlayerStatsUpdate {
                    set_last_name: Some(player_name.to_string()),
                    last_event: Some(event.timestamp.timestamp()),
                    ..Default::default()
                },
            )
            .await?;

        self.deps
            .notifier
            .notify_connect_event(server_id, player_name, None)
            .await;
        Ok(2)
    }
}

#[async_trait]
impl EventHandler for ConnectHandler {
    async fn handle(&self, event: &GameEvent) -> HandlerResult {
        let EventData::PlayerConnect(data) = &event.data else {
            return unexpected_variant(self.name(), event);
        };
        let meta = event.meta.as_ref();
        let (Some(steam_id), Some(player_name)) = (
            meta.and_then(|m| m.steam_id.as_deref()),
            meta.and_then(|m| m.player_name.as_deref()),
        ) else {
            return HandlerResult::failed(
                FailureKind::Validation,
                "connect event is missing player identity meta",
            );
        };
        let is_bot = meta.map(|m| m.is_bot).unwrap_or(false);

        match self.process(event, data, steam_id, player_name, is_bot).await {
            Ok(affected) => HandlerResult::ok_with(affected),
            Err(err) => err.to_handler_result(),
        }
    }

    fn name(&self) -> &str {
        "connect"
    }
}
