//! Accuracy bookkeeping: damage, weapon fire, and weapon hit events.
//!
//! These are high-frequency events; a slot with no live session is skipped
//! quietly instead of failing, so a burst arriving around a reconnect
//! cannot flood the dead-letter queue.

use crate::error::CoreResult;
use crate::repository::PlayerStatsUpdate;
use super::{unexpected_variant, HandlerDeps};
use async_trait::async_trait;
use scorekeep_event_system::{
    DamageData, EventData, EventHandler, GameEvent, HandlerResult, WeaponFireData, WeaponHitData,
};
use tracing::debug;

fn is_head(hitgroup: Option<&str>) -> bool {
    hitgroup.map(|h| h.eq_ignore_ascii_case("head")).unwrap_or(false)
}

pub struct DamageHandler {
    deps: HandlerDeps,
}

impl DamageHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    async fn process(&self, event: &GameEvent, data: &DamageData) -> CoreResult<HandlerResult> {
        let Some(session) = self
            .deps
            .sessions
            .get_session_by_game_user_id(event.server_id, data.attacker_game_user_id)
        else {
            debug!(
                "No session for damage attacker slot {} on server {}, skipping",
                data.attacker_game_user_id, event.server_id
            );
            return Ok(HandlerResult::ok());
        };

        self.deps
            .players
            .update(
                session.player_id,
                PlayerStatsUpdate {
                    shots: 1,
                    hits: 1,
                    headshots: is_head(data.hitgroup.as_deref()) as u64,
                    last_event: Some(event.timestamp.timestamp()),
                    ..Default::default()
                },
            )
            .await?;
        Ok(HandlerResult::ok_with(1))
    }
}

#[async_trait]
impl EventHandler for DamageHandler {
    async fn handle(&self, event: &GameEvent) -> HandlerResult {
        let EventData::PlayerDamage(data) = &event.data else {
            return unexpected_variant(self.name(), event);
        };
        match self.process(event, data).await {
            Ok(result) => result,
            Err(err) => err.to_handler_result(),
        }
    }

    fn name(&self) -> &str {
        "damage"
    }
}

/// Queue-direct: one shot fired.
pub struct WeaponFireHandler {
    deps: HandlerDeps,
}

impl WeaponFireHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    async fn process(&self, event: &GameEvent, data: &WeaponFireData) -> CoreResult<HandlerResult> {
        let Some(session) = self
            .deps
            .sessions
            .get_session_by_game_user_id(event.server_id, data.game_user_id)
        else {
            debug!(
                "No session for weapon fire slot {} on server {}, skipping",
                data.game_user_id, event.server_id
            );
            return Ok(HandlerResult::ok());
        };
        self.deps
            .players
            .update(
                session.player_id,
                PlayerStatsUpdate { shots: 1, ..Default::default() },
            )
            .await?;
        Ok(HandlerResult::ok_with(1))
    }
}

#[async_trait]
impl EventHandler for WeaponFireHandler {
    async fn handle(&self, event: &GameEvent) -> HandlerResult {
        let EventData::WeaponFire(data) = &event.data else {
            return unexpected_variant(self.name(), event);
        };
        match self.process(event, data).await {
            Ok(result) => result,
            Err(err) => err.to_handler_result(),
        }
    }

    fn name(&self) -> &str {
        "weapon_fire"
    }
}

/// Queue-direct: one shot connected.
pub struct WeaponHitHandler {
    deps: HandlerDeps,
}

impl WeaponHitHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    async fn process(&self, event: &GameEvent, data: &WeaponHitData) -> CoreResult<HandlerResult> {
        let Some(session) = self
            .deps
            .sessions
            .get_session_by_game_user_id(event.server_id, data.attacker_game_user_id)
        else {
            debug!(
                "No session for weapon hit slot {} on server {}, skipping",
                data.attacker_game_user_id, event.server_id
            );
            return Ok(HandlerResult::ok());
        };
        self.deps
            .players
            .update(
                session.player_id,
                PlayerStatsUpdate {
                    hits: 1,
                    headshots: is_head(data.hitgroup.as_deref()) as u64,
                    ..Default::default()
                },
            )
            .await?;
        Ok(HandlerResult::ok_with(1))
    }
}

#[async_trait]
impl EventHandler for WeaponHitHandler {
    async fn handle(&self, event: &GameEvent) -> HandlerResult {
        let EventData::WeaponHit(data) = &event.data else {
            return unexpected_variant(self.name(), event);
        };
        match self.process(event, data).await {
            Ok(result) => result,
            Err(err) => err.to_handler_result(),
        }
    }

    fn name(&self) -> &str {
        "weapon_hit"
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

    fn damage_event(slot: u32, hitgroup: &str) -> GameEvent {
        GameEvent::new(
            ServerId(1),
            Utc::now(),
            EventData::PlayerDamage(DamageData {
                attacker_game_user_id: slot,
                victim_game_user_id: Some(20),
                weapon: Some("deagle".to_string()),
                damage: 48,
                hitgroup: Some(hitgroup.to_string()),
            }),
        )
    }

    #[tokio::test]
    async fn test_damage_counts_accuracy() {
        let f = fixture();
        ConnectHandler::new(f.deps.clone())
            .handle(&connect_event(10, "STEAM_0:1:123", "Shooter"))
            .await;
        let player_id = f.deps.sessions.get_session_by_game_user_id(ServerId(1), 10).unwrap().player_id;

        let handler = DamageHandler::new(f.deps.clone());
        handler.handle(&damage_event(10, "chest")).await;
        handler.handle(&damage_event(10, "head")).await;

        let player = f.players.find_by_id(player_id).await.unwrap().unwrap();
        assert_eq!(player.shots, 2);
        assert_eq!(player.hits, 2);
        assert_eq!(player.headshots, 1);
    }

    #[tokio::test]
    async fn test_damage_without_session_is_quietly_skipped() {
        let f = fixture();
        let result = DamageHandler::new(f.deps).handle(&damage_event(10, "head")).await;
        assert!(result.success);
        assert_eq!(result.affected, 0);
    }

    #[tokio::test]
    async fn test_fire_and_hit_split_counters() {
        let f = fixture();
        ConnectHandler::new(f.deps.clone())
            .handle(&connect_event(10, "STEAM_0:1:123", "Shooter"))
            .await;
        let player_id = f.deps.sessions.get_session_by_game_user_id(ServerId(1), 10).unwrap().player_id;

        let fire = GameEvent::new(
            ServerId(1),
            Utc::now(),
            EventData::WeaponFire(WeaponFireData {
                game_user_id: 10,
                weapon: "m4a1".to_string(),
            }),
        );
        let hit = GameEvent::new(
            ServerId(1),
            Utc::now(),
            EventData::WeaponHit(WeaponHitData {
                attacker_game_user_id: 10,
                victim_game_user_id: 20,
                weapon: "m4a1".to_string(),
                damage: 20,
                hitgroup: Some("head".to_string()),
            }),
        );

        WeaponFireHandler::new(f.deps.clone()).handle(&fire).await;
        WeaponFireHandler::new(f.deps.clone()).handle(&fire).await;
        WeaponHitHandler::new(f.deps.clone()).handle(&hit).await;

        let player = f.players.find_by_id(player_id).await.unwrap().unwrap();
        assert_eq!(player.shots, 2);
        assert_eq!(player.hits, 1);
        assert_eq!(player.headshots, 1);
    }
}
