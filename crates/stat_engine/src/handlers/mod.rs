//! Per-event-type domain handlers.
//!
//! Every handler validates its event, resolves identities through the
//! session layer, computes deltas, persists, and emits notifications.
//! Handlers convert all failures into structured results; nothing ever
//! propagates a raw error to the bus.
//!
//! Routing split: low-volume lifecycle events register on the bus via
//! [`register_bus_handlers`]; the high-volume combat events
//! (`PLAYER_KILL`, `WEAPON_FIRE`, `WEAPON_HIT`) bypass the bus and are
//! dispatched directly by the queue consumer via [`direct_handlers`].

mod chat;
mod connect;
mod damage;
mod disconnect;
mod kill;
mod roster;
mod suicide;

pub use chat::ChatHandler;
pub use connect::ConnectHandler;
pub use damage::{DamageHandler, WeaponFireHandler, WeaponHitHandler};
pub use disconnect::DisconnectHandler;
pub use kill::{KillHandler, TeamkillHandler};
pub use roster::{ChangeNameHandler, ChangeRoleHandler, ChangeTeamHandler, EntryHandler};
pub use suicide::SuicideHandler;

use crate::notify::NotificationDispatcher;
use crate::ranking::RankingService;
use crate::repository::{PlayerRepository, ServerRepository};
use crate::resolver::PlayerResolver;
use crate::session::SessionService;
use scorekeep_event_system::{
    EventBus, EventHandler, EventType, FailureKind, GameEvent, HandlerResult,
};
use std::sync::Arc;

/// The collaborators handlers are built from.
#[derive(Clone)]
pub struct HandlerDeps {
    pub players: Arc<dyn PlayerRepository>,
    pub servers: Arc<dyn ServerRepository>,
    pub ranking: Arc<dyn RankingService>,
    pub resolver: Arc<PlayerResolver>,
    pub sessions: Arc<SessionService>,
    pub notifier: Arc<NotificationDispatcher>,
}

/// A handler received an event variant it is not wired for.
pub(crate) fn unexpected_variant(handler: &str, event: &GameEvent) -> HandlerResult {
    HandlerResult::failed(
        FailureKind::Validation,
        format!("{handler} cannot process {} events", event.event_type()),
    )
}

/// Registers every bus-routed handler. Queue-direct types are deliberately
/// absent; see [`direct_handlers`].
pub async fn register_bus_handlers(bus: &EventBus, deps: &HandlerDeps) -> Vec<String> {
    let mut ids = Vec::new();
    ids.push(
        bus.on(EventType::PlayerConnect, Arc::new(ConnectHandler::new(deps.clone())))
            .await,
    );
    ids.push(
        bus.on(EventType::PlayerDisconnect, Arc::new(DisconnectHandler::new(deps.clone())))
            .await,
    );
    ids.push(
        bus.on(EventType::PlayerSuicide, Arc::new(SuicideHandler::new(deps.clone())))
            .await,
    );
    ids.push(
        bus.on(EventType::PlayerTeamkill, Arc::new(TeamkillHandler::new(deps.clone())))
            .await,
    );
    ids.push(
        bus.on(EventType::PlayerDamage, Arc::new(DamageHandler::new(deps.clone())))
            .await,
    );
    ids.push(
        bus.on(EventType::ChatMessage, Arc::new(ChatHandler::new(deps.clone())))
            .await,
    );
    ids.push(
        bus.on(EventType::PlayerEntry, Arc::new(EntryHandler::new(deps.clone())))
            .await,
    );
    ids.push(
        bus.on(EventType::PlayerChangeName, Arc::new(ChangeNameHandler::new(deps.clone())))
            .await,
    );
    ids.push(
        bus.on(EventType::PlayerChangeTeam, Arc::new(ChangeTeamHandler::new(deps.clone())))
            .await,
    );
    ids.push(
        bus.on(EventType::PlayerChangeRole, Arc::new(ChangeRoleHandler::new(deps.clone())))
            .await,
    );
    ids
}

/// The queue-direct routing table: high-volume combat events dispatched by
/// the consumer without priority scheduling.
pub fn direct_handlers(deps: &HandlerDeps) -> Vec<(EventType, Arc<dyn EventHandler>)> {
    vec![
        (EventType::PlayerKill, Arc::new(KillHandler::new(deps.clone())) as Arc<dyn EventHandler>),
        (EventType::WeaponFire, Arc::new(WeaponFireHandler::new(deps.clone()))),
        (EventType::WeaponHit, Arc::new(WeaponHitHandler::new(deps.clone()))),
    ]
}
