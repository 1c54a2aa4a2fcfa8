//! Kill and teamkill handlers: skill movement, streak bookkeeping, and the
//! frag event trail.

use crate::error::CoreResult;
use crate::ranking::KillContext;
use crate::repository::{update_with_skill_clamp, AuditEventRow, AuditKind, FragEventRow, PlayerStatsUpdate};
use super::{unexpected_variant, HandlerDeps};
use async_trait::async_trait;
use scorekeep_event_system::{
    EventData, EventHandler, FailureKind, GameEvent, HandlerResult, KillData, TeamkillData,
};
use tracing::warn;

const STATS_UNAVAILABLE: &str = "Unable to retrieve player stats for skill calculation";

pub struct KillHandler {
    deps: HandlerDeps,
}

impl KillHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    async fn process(&self, event: &GameEvent, data: &KillData) -> CoreResult<HandlerResult> {
        let server_id = event.server_id;

        // Kill is the only handler that hard-requires both parties.
        let killer_session = self
            .deps
            .sessions
            .get_session_by_game_user_id(server_id, data.killer_game_user_id);
        let victim_session = self
            .deps
            .sessions
            .get_session_by_game_user_id(server_id, data.victim_game_user_id);
        let (Some(killer_session), Some(victim_session)) = (killer_session, victim_session) else {
            return Ok(HandlerResult::failed(FailureKind::Validation, STATS_UNAVAILABLE));
        };

        let killer = self.deps.players.get_player_stats(killer_session.player_id).await?;
        let victim = self.deps.players.get_player_stats(victim_session.player_id).await?;
        let (Some(killer), Some(victim)) = (killer, victim) else {
            return Ok(HandlerResult::failed(FailureKind::Validation, STATS_UNAVAILABLE));
        };

        let ctx = KillContext {
            weapon: data.weapon.clone(),
            headshot: data.headshot,
            killer_team: data.killer_team.clone(),
            victim_team: data.victim_team.clone(),
        };
        let adjustment = self
            .deps
            .ranking
            .calculate_skill_adjustment(&killer, &victim, &ctx)
            .await?;

        let friendly_fire =
            data.killer_team.is_some() && data.killer_team == data.victim_team;
        if friendly_fire {
            warn!(
                "Kill between teammates on server {}: {} -> {} ({:?})",
                server_id, killer.player_id, victim.player_id, data.killer_team
            );
        }

        let now = event.timestamp.timestamp();
        let killer_update = PlayerStatsUpdate {
            kills: 1,
            headshots: data.headshot as u64,
            teamkills: friendly_fire as u64,
            skill_delta: adjustment.killer_change,
            set_kill_streak: Some(killer.kill_streak + 1),
            set_death_streak: Some(0),
            last_event: Some(now),
            ..Default::default()
        };
        let victim_update = PlayerStatsUpdate {
            deaths: 1,
            skill_delta: adjustment.victim_change,
            set_death_streak: Some(victim.death_streak + 1),
            set_kill_streak: Some(0),
            last_event: Some(now),
            ..Default::default()
        };
        let frag_row = FragEventRow {
            server_id,
            killer_id: killer.player_id,
            victim_id: victim.player_id,
            event_time: event.timestamp,
            weapon: data.weapon.clone(),
            headshot: data.headshot,
            map: self.deps.servers.get_active_map(server_id).await.unwrap_or(None),
            killer_position: data.killer_position,
            victim_position: data.victim_position,
        };

        // Both updates and the frag row run concurrently; the frag trail is
        // best-effort.
        let (killer_result, victim_result, frag_result) = tokio::join!(
            update_with_skill_clamp(
                self.deps.players.as_ref(),
                killer.player_id,
                killer.skill,
                killer_update,
            ),
            update_with_skill_clamp(
                self.deps.players.as_ref(),
                victim.player_id,
                victim.skill,
                victim_update,
            ),
            self.deps.players.log_event_frag(frag_row),
        );
        killer_result?;
        victim_result?;
        if let Err(err) = frag_result {
            warn!("Failed to record frag event: {}", err);
        }

        self.deps
            .notifier
            .notify_kill_event(
                server_id,
                &killer_session.player_name,
                killer.skill.saturating_add_signed(adjustment.killer_change),
                adjustment.killer_change,
                &victim_session.player_name,
                victim.skill.saturating_add_signed(adjustment.victim_change),
                adjustment.victim_change,
                &data.weapon,
                data.headshot,
            )
            .await;
        Ok(HandlerResult::ok_with(2))
    }
}

#[async_trait]
impl EventHandler for KillHandler {
    async fn handle(&self, event: &GameEvent) -> HandlerResult {
        let EventData::PlayerKill(data) = &event.data else {
            return unexpected_variant(self.name(), event);
        };
        match self.process(event, data).await {
            Ok(result) => result,
            Err(err) => err.to_handler_result(),
        }
    }

    fn name(&self) -> &str {
        "kill"
    }
}

/// Explicit teamkill events: counter plus audit trail, no rating movement.
pub struct TeamkillHandler {
    deps: HandlerDeps,
}

impl TeamkillHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    async fn process(&self, event: &GameEvent, data: &TeamkillData) -> CoreResult<HandlerResult> {
        let server_id = event.server_id;
        let killer = self
            .deps
            .sessions
            .get_session_by_game_user_id(server_id, data.killer_game_user_id);
        let victim = self
            .deps
            .sessions
            .get_session_by_game_user_id(server_id, data.victim_game_user_id);
        let (Some(killer), Some(victim)) = (killer, victim) else {
            return Ok(HandlerResult::failed(
                FailureKind::Validation,
                "teamkill participants have no live session",
            ));
        };

        self.deps
            .players
            .update(
                killer.player_id,
                PlayerStatsUpdate {
                    teamkills: 1,
                    last_event: Some(event.timestamp.timestamp()),
                    ..Default::default()
                },
            )
            .await?;
        self.deps
            .players
            .log_audit_event(AuditEventRow {
                server_id,
                player_id: killer.player_id,
                event_time: event.timestamp,
                kind: AuditKind::Teamkill,
                detail: format!("killed teammate {} with {}", victim.player_name, data.weapon),
            })
            .await?;

        self.deps
            .notifier
            .notify_teamkill_event(server_id, &killer.player_name, &victim.player_name, &data.weapon)
            .await;
        Ok(HandlerResult::ok_with(1))
    }
}

#[async_trait]
impl EventHandler for TeamkillHandler {
    async fn handle(&self, event: &GameEvent) -> HandlerResult {
        let EventData::PlayerTeamkill(data) = &event.data else {
            return unexpected_variant(self.name(), event);
        };
        match self.process(event, data).await {
            Ok(result) => result,
            Err(err) => err.to_handler_result(),
        }
    }

    fn name(&self) -> &str {
        "teamkill"
    }
}
