//! Chat handler: persists chat lines with the current map and message
//! mode.

use crate::error::CoreResult;
use crate::repository::ChatEventRow;
use super::{unexpected_variant, HandlerDeps};
use async_trait::async_trait;
use scorekeep_event_system::{ChatData, EventData, EventHandler, GameEvent, HandlerResult};
use tracing::{debug, info};

pub struct ChatHandler {
    deps: HandlerDeps,
}

impl ChatHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    async fn process(&self, event: &GameEvent, data: &ChatData) -> CoreResult<HandlerResult> {
        let server_id = event.server_id;
        let Some(session) = self
            .deps
            .sessions
            .get_session_by_game_user_id(server_id, data.game_user_id)
        else {
            debug!(
                "No session for chat on slot {} on server {}, skipping",
                data.game_user_id, server_id
            );
            return Ok(HandlerResult::ok());
        };

        let map = self.deps.servers.get_active_map(server_id).await.unwrap_or(None);
        info!(
            target: "chat",
            server = %server_id,
            player = %session.player_name,
            mode = data.message_mode,
            "{}",
            data.message
        );

        self.deps
            .players
            .create_chat_event(ChatEventRow {
                server_id,
                player_id: session.player_id,
                event_time: event.timestamp,
                map,
                message: data.message.clone(),
                message_mode: data.message_mode,
            })
            .await?;
        Ok(HandlerResult::ok_with(1))
    }
}

#[async_trait]
impl EventHandler for ChatHandler {
    async fn handle(&self, event: &GameEvent) -> HandlerResult {
        let EventData::ChatMessage(data) = &event.data else {
            return unexpected_variant(self.name(), event);
        };
        match self.process(event, data).await {
            Ok(result) => result,
            Err(err) => err.to_handler_result(),
        }
    }

    fn name(&self) -> &str {
        "chat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::connect::tests::connect_event;
    use crate::handlers::testutil::fixture;
    use crate::handlers::ConnectHandler;
    use chrono::Utc;
    use scorekeep_event_system::ServerId;

    fn chat_event(slot: u32, message: &str, mode: u8) -> GameEvent {
        GameEvent::new(
            ServerId(1),
            Utc::now(),
            EventData::ChatMessage(ChatData {
                game_user_id: slot,
                message: message.to_string(),
                message_mode: mode,
            }),
        )
    }

    #[tokio::test]
    async fn test_chat_row_carries_map_and_mode() {
        let f = fixture();
        f.servers.set_active_map(ServerId(1), "de_inferno");
        ConnectHandler::new(f.deps.clone())
            .handle(&connect_event(10, "STEAM_0:1:123", "Talker"))
            .await;

        let result = ChatHandler::new(f.deps.clone())
            .handle(&chat_event(10, "rush B", 1))
            .await;
        assert!(result.success);

        let rows = f.players.chat_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message, "rush B");
        assert_eq!(rows[0].message_mode, 1);
        assert_eq!(rows[0].map.as_deref(), Some("de_inferno"));
    }

    #[tokio::test]
    async fn test_chat_without_session_is_skipped() {
        let f = fixture();
        let result = ChatHandler::new(f.deps.clone())
            .handle(&chat_event(10, "hello?", 0))
            .await;
        assert!(result.success);
        assert!(f.players.chat_rows().is_empty());
    }
}
