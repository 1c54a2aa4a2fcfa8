//! Suicide handler: penalty, streak bookkeeping, audit trail.

use crate::error::CoreResult;
use crate::repository::{update_with_skill_clamp, AuditEventRow, AuditKind, PlayerStatsUpdate};
use super::{unexpected_variant, HandlerDeps};
use async_trait::async_trait;
use scorekeep_event_system::{
    EventData, EventHandler, FailureKind, GameEvent, HandlerResult, SuicideData,
};

pub struct SuicideHandler {
    deps: HandlerDeps,
}

impl SuicideHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    async fn process(&self, event: &GameEvent, data: &SuicideData) -> CoreResult<HandlerResult> {
        let server_id = event.server_id;
        let Some(session) = self
            .deps
            .sessions
            .get_session_by_game_user_id(server_id, data.game_user_id)
        else {
            return Ok(HandlerResult::failed(
                FailureKind::Validation,
                format!("no live session for suicide on slot {}", data.game_user_id),
            ));
        };

        let Some(player) = self.deps.players.get_player_stats(session.player_id).await? else {
            return Ok(HandlerResult::failed(
                FailureKind::Validation,
                format!("player {} missing for suicide update", session.player_id),
            ));
        };

        let penalty = self.deps.ranking.calculate_suicide_penalty();
        let update = PlayerStatsUpdate {
            suicides: 1,
            deaths: 1,
            skill_delta: penalty,
            set_kill_streak: Some(0),
            set_death_streak: Some(player.death_streak + 1),
            last_event: Some(event.timestamp.timestamp()),
            ..Default::default()
        };
        update_with_skill_clamp(self.deps.players.as_ref(), player.player_id, player.skill, update)
            .await?;

        self.deps
            .players
            .log_audit_event(AuditEventRow {
                server_id,
                player_id: player.player_id,
                event_time: event.timestamp,
                kind: AuditKind::Suicide,
                detail: data.weapon.clone().unwrap_or_else(|| "world".to_string()),
            })
            .await?;

        self.deps
            .notifier
            .notify_suicide_event(server_id, &session.player_name, data.weapon.as_deref(), penalty)
            .await;
        Ok(HandlerResult::ok_with(1))
    }
}

#[async_trait]
impl EventHandler for SuicideHandler {
    async fn handle(&self, event: &GameEvent) -> HandlerResult {
        let EventData::PlayerSuicide(data) = &event.data else {
            return unexpected_variant(self.name(), event);
        };
        match self.process(event, data).await {
            Ok(result) => result,
            Err(err) => err.to_handler_result(),
        }
    }

    fn name(&self) -> &str {
        "suicide"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::connect::tests::connect_event;
    use crate::handlers::testutil::fixture;
    use crate::repository::PlayerRepository;
    use crate::handlers::ConnectHandler;
    use chrono::Utc;
    use scorekeep_event_system::ServerId;

    fn suicide_event(slot: u32) -> GameEvent {
        GameEvent::new(
            ServerId(1),
            Utc::now(),
            EventData::PlayerSuicide(SuicideData {
                game_user_id: slot,
                weapon: Some("hegrenade".to_string()),
            }),
        )
    }

    #[tokio::test]
    async fn test_suicide_applies_penalty_and_streaks() {
        let f = fixture();
        ConnectHandler::new(f.deps.clone())
            .handle(&connect_event(7, "STEAM_0:1:123", "Clumsy"))
            .await;
        let player_id = f.deps.sessions.get_session_by_game_user_id(ServerId(1), 7).unwrap().player_id;

        let result = SuicideHandler::new(f.deps.clone()).handle(&suicide_event(7)).await;
        assert!(result.success);

        let player = f.players.find_by_id(player_id).await.unwrap().unwrap();
        assert_eq!(player.suicides, 1);
        assert_eq!(player.deaths, 1);
        assert_eq!(player.skill, 995);
        assert_eq!(player.kill_streak, 0);
        assert_eq!(player.death_streak, 1);
        assert_eq!(f.players.audit_rows().len(), 1);
    }

    #[tokio::test]
    async fn test_suicide_penalty_clamps_at_zero() {
        let f = fixture();
        ConnectHandler::new(f.deps.clone())
            .handle(&connect_event(7, "STEAM_0:1:123", "Clumsy"))
            .await;
        let player_id = f.deps.sessions.get_session_by_game_user_id(ServerId(1), 7).unwrap().player_id;
        f.players
            .update(player_id, PlayerStatsUpdate { skill_delta: -998, ..Default::default() })
            .await
            .unwrap();

        let result = SuicideHandler::new(f.deps.clone()).handle(&suicide_event(7)).await;
        assert!(result.success);

        let player = f.players.find_by_id(player_id).await.unwrap().unwrap();
        assert_eq!(player.skill, 0);
    }

    #[tokio::test]
    async fn test_suicide_without_session_fails() {
        let f = fixture();
        let result = SuicideHandler::new(f.deps).handle(&suicide_event(7)).await;
        assert!(!result.success);
        assert_eq!(result.error.unwrap().kind, FailureKind::Validation);
    }
}
