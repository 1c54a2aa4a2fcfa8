//! Roster handlers: game entry, name changes, team changes, role changes.
//!
//! Team and role changes are audit rows only; no counters move. A missing
//! session is skipped quietly since these events carry no stat value on
//! their own.

use crate::error::CoreResult;
use crate::repository::{AuditEventRow, AuditKind, PlayerStatsUpdate};
use crate::session::SessionUpdate;
use super::{unexpected_variant, HandlerDeps};
use async_trait::async_trait;
use scorekeep_event_system::{
    ChangeNameData, ChangeRoleData, ChangeTeamData, EntryData, EventData, EventHandler, GameEvent,
    HandlerResult, PlayerId, ServerId,
};
use tracing::debug;

async fn audit(
    deps: &HandlerDeps,
    server_id: ServerId,
    player_id: PlayerId,
    event: &GameEvent,
    kind: AuditKind,
    detail: String,
) -> CoreResult<()> {
    deps.players
        .log_audit_event(AuditEventRow {
            server_id,
            player_id,
            event_time: event.timestamp,
            kind,
            detail,
        })
        .await
}

/// Player entered the game proper (picked a team after connecting).
pub struct EntryHandler {
    deps: HandlerDeps,
}

impl EntryHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    async fn process(&self, event: &GameEvent, data: &EntryData) -> CoreResult<HandlerResult> {
        let Some(session) = self
            .deps
            .sessions
            .get_session_by_game_user_id(event.server_id, data.game_user_id)
        else {
            debug!("No session for entry on slot {}, skipping", data.game_user_id);
            return Ok(HandlerResult::ok());
        };
        self.deps
            .players
            .update(
                session.player_id,
                PlayerStatsUpdate::touch(event.timestamp.timestamp()),
            )
            .await?;
        audit(
            &self.deps,
            event.server_id,
            session.player_id,
            event,
            AuditKind::Entry,
            "entered the game".to_string(),
        )
        .await?;
        Ok(HandlerResult::ok_with(1))
    }
}

#[async_trait]
impl EventHandler for EntryHandler {
    async fn handle(&self, event: &GameEvent) -> HandlerResult {
        let EventData::PlayerEntry(data) = &event.data else {
            return unexpected_variant(self.name(), event);
        };
        match self.process(event, data).await {
            Ok(result) => result,
            Err(err) => err.to_handler_result(),
        }
    }

    fn name(&self) -> &str {
        "entry"
    }
}

pub struct ChangeNameHandler {
    deps: HandlerDeps,
}

impl ChangeNameHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    async fn process(&self, event: &GameEvent, data: &ChangeNameData) -> CoreResult<HandlerResult> {
        let server_id = event.server_id;
        let Some(session) = self
            .deps
            .sessions
            .get_session_by_game_user_id(server_id, data.game_user_id)
        else {
            debug!("No session for name change on slot {}, skipping", data.game_user_id);
            return Ok(HandlerResult::ok());
        };

        self.deps.sessions.update_session(
            server_id,
            data.game_user_id,
            SessionUpdate { player_name: Some(data.new_name.clone()) },
        );
        self.deps
            .players
            .update(
                session.player_id,
                PlayerStatsUpdate {
                    set_last_name: Some(data.new_name.clone()),
                    last_event: Some(event.timestamp.timestamp()),
                    ..Default::default()
                },
            )
            .await?;
        audit(
            &self.deps,
            server_id,
            session.player_id,
            event,
            AuditKind::NameChange,
            format!("{} -> {}", data.old_name, data.new_name),
        )
        .await?;
        Ok(HandlerResult::ok_with(1))
    }
}

#[async_trait]
impl EventHandler for ChangeNameHandler {
    async fn handle(&self, event: &GameEvent) -> HandlerResult {
        let EventData::PlayerChangeName(data) = &event.data else {
            return unexpected_variant(self.name(), event);
        };
        match self.process(event, data).await {
            Ok(result) => result,
            Err(err) => err.to_handler_result(),
        }
    }

    fn name(&self) -> &str {
        "change_name"
    }
}

pub struct ChangeTeamHandler {
    deps: HandlerDeps,
}

impl ChangeTeamHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl EventHandler for ChangeTeamHandler {
    async fn handle(&self, event: &GameEvent) -> HandlerResult {
        let EventData::PlayerChangeTeam(data) = &event.data else {
            return unexpected_variant(self.name(), event);
        };
        let Some(session) = self
            .deps
            .sessions
            .get_session_by_game_user_id(event.server_id, data.game_user_id)
        else {
            debug!("No session for team change on slot {}, skipping", data.game_user_id);
            return HandlerResult::ok();
        };
        match audit(
            &self.deps,
            event.server_id,
            session.player_id,
            event,
            AuditKind::TeamChange,
            data.team.clone(),
        )
        .await
        {
            Ok(()) => HandlerResult::ok_with(1),
            Err(err) => err.to_handler_result(),
        }
    }

    fn name(&self) -> &str {
        "change_team"
    }
}

pub struct ChangeRoleHandler {
    deps: HandlerDeps,
}

impl ChangeRoleHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl EventHandler for ChangeRoleHandler {
    async fn handle(&self, event: &GameEvent) -> HandlerResult {
        let EventData::PlayerChangeRole(data) = &event.data else {
            return unexpected_variant(self.name(), event);
        };
        let Some(session) = self
            .deps
            .sessions
            .get_session_by_game_user_id(event.server_id, data.game_user_id)
        else {
            debug!("No session for role change on slot {}, skipping", data.game_user_id);
            return HandlerResult::ok();
        };
        match audit(
            &self.deps,
            event.server_id,
            session.player_id,
            event,
            AuditKind::RoleChange,
            data.role.clone(),
        )
        .await
        {
            Ok(()) => HandlerResult::ok_with(1),
            Err(err) => err.to_handler_result(),
        }
    }

    fn name(&self) -> &str {
        "change_role"
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

    #[tokio::test]
    async fn test_name_change_updates_session_and_record() {
        let f = fixture();
        ConnectHandler::new(f.deps.clone())
            .handle(&connect_event(10, "STEAM_0:1:123", "OldName"))
            .await;
        let player_id = f
            .deps
            .sessions
            .get_session_by_game_user_id(ServerId(1), 10)
            .unwrap()
            .player_id;

        let event = GameEvent::new(
            ServerId(1),
            Utc::now(),
            EventData::PlayerChangeName(ChangeNameData {
                game_user_id: 10,
                old_name: "OldName".to_string(),
                new_name: "NewName".to_string(),
            }),
        );
        let result = ChangeNameHandler::new(f.deps.clone()).handle(&event).await;
        assert!(result.success);

        let session = f.deps.sessions.get_session_by_game_user_id(ServerId(1), 10).unwrap();
        assert_eq!(session.player_name, "NewName");
        let player = f.players.find_by_id(player_id).await.unwrap().unwrap();
        assert_eq!(player.last_name, "NewName");
        assert_eq!(f.players.audit_rows().len(), 1);
    }

    #[tokio::test]
    async fn test_team_and_role_changes_are_audit_only() {
        let f = fixture();
        ConnectHandler::new(f.deps.clone())
            .handle(&connect_event(10, "STEAM_0:1:123", "Player"))
            .await;
        let player_id = f
            .deps
            .sessions
            .get_session_by_game_user_id(ServerId(1), 10)
            .unwrap()
            .player_id;
        let before = f.players.find_by_id(player_id).await.unwrap().unwrap();

        let team_event = GameEvent::new(
            ServerId(1),
            Utc::now(),
            EventData::PlayerChangeTeam(ChangeTeamData {
                game_user_id: 10,
                team: "CT".to_string(),
            }),
        );
        let role_event = GameEvent::new(
            ServerId(1),
            Utc::now(),
            EventData::PlayerChangeRole(ChangeRoleData {
                game_user_id: 10,
                role: "sniper".to_string(),
            }),
        );
        ChangeTeamHandler::new(f.deps.clone()).handle(&team_event).await;
        ChangeRoleHandler::new(f.deps.clone()).handle(&role_event).await;

        let after = f.players.find_by_id(player_id).await.unwrap().unwrap();
        assert_eq!(before.kills, after.kills);
        assert_eq!(before.skill, after.skill);
        assert_eq!(f.players.audit_rows().len(), 2);
    }

    #[tokio::test]
    async fn test_entry_touches_last_event() {
        let f = fixture();
        ConnectHandler::new(f.deps.clone())
            .handle(&connect_event(10, "STEAM_0:1:123", "Player"))
            .await;

        let event = GameEvent::new(
            ServerId(1),
            Utc::now(),
            EventData::PlayerEntry(EntryData { game_user_id: 10 }),
        );
        let result = EntryHandler::new(f.deps.clone()).handle(&event).await;
        assert!(result.success);
        assert_eq!(f.players.audit_rows().len(), 1);
    }
}
