//! # Event Taxonomy
//!
//! This module defines the closed set of game-telemetry events the daemon
//! processes, the common event header, and the handler abstractions the bus
//! dispatches to.
//!
//! ## Wire Format
//!
//! Events arrive as JSON queue messages:
//!
//! ```json
//! {
//!   "eventType": "PLAYER_CONNECT",
//!   "timestamp": "2024-03-01T18:22:03Z",
//!   "serverId": 1,
//!   "eventId": "msg_lv3k2p_0123456789abcdef",
//!   "data": { "gameUserId": 10, "ipAddress": "203.0.113.7" },
//!   "meta": { "steamId": "STEAM_0:1:123456", "playerName": "TestPlayer" }
//! }
//! ```
//!
//! `eventType` and `data` form a tagged union ([`EventData`]); the remaining
//! header fields live on [`GameEvent`]. `meta` carries the player identity as
//! parsed from the raw log line, before resolution to a durable player.
//!
//! ## Design Principles
//!
//! - **Tagged unions over inheritance**: handlers branch by variant, never
//!   downcast.
//! - **Closed set**: unknown `eventType` strings fail deserialization and are
//!   dead-lettered at the queue boundary.

use crate::types::{Position, ServerId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Event Types
// ============================================================================

/// Discriminator for the closed set of event variants.
///
/// The wire spelling is the SCREAMING_SNAKE_CASE form, e.g.
/// `EventType::PlayerConnect` ⇔ `"PLAYER_CONNECT"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    PlayerConnect,
    PlayerDisconnect,
    PlayerKill,
    PlayerSuicide,
    PlayerTeamkill,
    PlayerDamage,
    PlayerEntry,
    PlayerChangeName,
    PlayerChangeTeam,
    PlayerChangeRole,
    ChatMessage,
    WeaponFire,
    WeaponHit,
    ActionPlayer,
    ActionTeam,
    ActionPlayerPlayer,
    RoundStart,
    RoundEnd,
    ServerAuthenticated,
}

impl EventType {
    /// Every variant, in declaration order. Used by registration sweeps and
    /// the bus statistics breakdown.
    pub const ALL: [EventType; 19] = [
        EventType::PlayerConnect,
        EventType::PlayerDisconnect,
        EventType::PlayerKill,
        EventType::PlayerSuicide,
        EventType::PlayerTeamkill,
        EventType::PlayerDamage,
        EventType::PlayerEntry,
        EventType::PlayerChangeName,
        EventType::PlayerChangeTeam,
        EventType::PlayerChangeRole,
        EventType::ChatMessage,
        EventType::WeaponFire,
        EventType::WeaponHit,
        EventType::ActionPlayer,
        EventType::ActionTeam,
        EventType::ActionPlayerPlayer,
        EventType::RoundStart,
        EventType::RoundEnd,
        EventType::ServerAuthenticated,
    ];

    /// The wire spelling of this event type.
    pub fn wire_name(&self) -> &'static str {
        match self {
            EventType::PlayerConnect => "PLAYER_CONNECT",
            EventType::PlayerDisconnect => "PLAYER_DISCONNECT",
            EventType::PlayerKill => "PLAYER_KILL",
            EventType::PlayerSuicide => "PLAYER_SUICIDE",
            EventType::PlayerTeamkill => "PLAYER_TEAMKILL",
            EventType::PlayerDamage => "PLAYER_DAMAGE",
            EventType::PlayerEntry => "PLAYER_ENTRY",
            EventType::PlayerChangeName => "PLAYER_CHANGE_NAME",
            EventType::PlayerChangeTeam => "PLAYER_CHANGE_TEAM",
            EventType::PlayerChangeRole => "PLAYER_CHANGE_ROLE",
            EventType::ChatMessage => "CHAT_MESSAGE",
            EventType::WeaponFire => "WEAPON_FIRE",
            EventType::WeaponHit => "WEAPON_HIT",
            EventType::ActionPlayer => "ACTION_PLAYER",
            EventType::ActionTeam => "ACTION_TEAM",
            EventType::ActionPlayerPlayer => "ACTION_PLAYER_PLAYER",
            EventType::RoundStart => "ROUND_START",
            EventType::RoundEnd => "ROUND_END",
            EventType::ServerAuthenticated => "SERVER_AUTHENTICATED",
        }
    }

    /// High-volume event types that bypass the bus entirely: the queue
    /// consumer routes them straight to their handler without priority
    /// scheduling. These types are never registered on the bus.
    pub fn is_queue_direct(&self) -> bool {
        matches!(
            self,
            EventType::PlayerKill | EventType::WeaponFire | EventType::WeaponHit
        )
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

// ============================================================================
// Event Payloads
// ============================================================================

/// Payload of a `PLAYER_CONNECT` event. Identity lives in the event `meta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectData {
    /// Game-issued slot number, unique per server for this connection.
    pub game_user_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// Payload of a `PLAYER_DISCONNECT` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectData {
    pub game_user_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Payload of a `PLAYER_KILL` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillData {
    pub killer_game_user_id: u32,
    pub victim_game_user_id: u32,
    pub weapon: String,
    #[serde(default)]
    pub headshot: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub killer_team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victim_team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub killer_position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victim_position: Option<Position>,
}

/// Payload of a `PLAYER_SUICIDE` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuicideData {
    pub game_user_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<String>,
}

/// Payload of a `PLAYER_TEAMKILL` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamkillData {
    pub killer_game_user_id: u32,
    pub victim_game_user_id: u32,
    pub weapon: String,
    #[serde(default)]
    pub headshot: bool,
}

/// Payload of a `PLAYER_DAMAGE` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageData {
    pub attacker_game_user_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victim_game_user_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<String>,
    #[serde(default)]
    pub damage: u32,
    /// Body part hit, as reported by the game ("head", "chest", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hitgroup: Option<String>,
}

/// Payload of a `PLAYER_ENTRY` event (player entered the game proper).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryData {
    pub game_user_id: u32,
}

/// Payload of a `PLAYER_CHANGE_NAME` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNameData {
    pub game_user_id: u32,
    pub old_name: String,
    pub new_name: String,
}

/// Payload of a `PLAYER_CHANGE_TEAM` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeTeamData {
    pub game_user_id: u32,
    pub team: String,
}

/// Payload of a `PLAYER_CHANGE_ROLE` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleData {
    pub game_user_id: u32,
    pub role: String,
}

/// Payload of a `CHAT_MESSAGE` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatData {
    pub game_user_id: u32,
    pub message: String,
    /// 0 = all chat, 1 = team chat.
    #[serde(default)]
    pub message_mode: u8,
}

/// Payload of a `WEAPON_FIRE` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponFireData {
    pub game_user_id: u32,
    pub weapon: String,
}

/// Payload of a `WEAPON_HIT` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponHitData {
    pub attacker_game_user_id: u32,
    pub victim_game_user_id: u32,
    pub weapon: String,
    #[serde(default)]
    pub damage: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hitgroup: Option<String>,
}

/// Payload of an `ACTION_PLAYER` event (map objective, bomb plant, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlayerData {
    pub game_user_id: u32,
    pub action: String,
    #[serde(default)]
    pub bonus: i32,
}

/// Payload of an `ACTION_TEAM` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTeamData {
    pub team: String,
    pub action: String,
}

/// Payload of an `ACTION_PLAYER_PLAYER` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlayerPlayerData {
    pub game_user_id: u32,
    pub victim_game_user_id: u32,
    pub action: String,
}

/// Payload of a `ROUND_START` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStartData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
}

/// Payload of a `ROUND_END` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundEndData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_team: Option<String>,
}

/// Payload of a `SERVER_AUTHENTICATED` event: a game server completed its
/// handshake with the daemon and is ready for RCON enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerAuthenticatedData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// The tagged union over every event payload.
///
/// `eventType` is the tag, `data` the content, so a serialized
/// [`GameEvent`] (which flattens this enum) matches the queue wire format
/// exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "eventType", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventData {
    PlayerConnect(ConnectData),
    PlayerDisconnect(DisconnectData),
    PlayerKill(KillData),
    PlayerSuicide(SuicideData),
    PlayerTeamkill(TeamkillData),
    PlayerDamage(DamageData),
    PlayerEntry(EntryData),
    PlayerChangeName(ChangeNameData),
    PlayerChangeTeam(ChangeTeamData),
    PlayerChangeRole(ChangeRoleData),
    ChatMessage(ChatData),
    WeaponFire(WeaponFireData),
    WeaponHit(WeaponHitData),
    ActionPlayer(ActionPlayerData),
    ActionTeam(ActionTeamData),
    ActionPlayerPlayer(ActionPlayerPlayerData),
    RoundStart(RoundStartData),
    RoundEnd(RoundEndData),
    ServerAuthenticated(ServerAuthenticatedData),
}

impl EventData {
    /// Maps the payload variant back to its discriminator.
    pub fn event_type(&self) -> EventType {
        match self {
            EventData::PlayerConnect(_) => EventType::PlayerConnect,
            EventData::PlayerDisconnect(_) => EventType::PlayerDisconnect,
            EventData::PlayerKill(_) => EventType::PlayerKill,
            EventData::PlayerSuicide(_) => EventType::PlayerSuicide,
            EventData::PlayerTeamkill(_) => EventType::PlayerTeamkill,
            EventData::PlayerDamage(_) => EventType::PlayerDamage,
            EventData::PlayerEntry(_) => EventType::PlayerEntry,
            EventData::PlayerChangeName(_) => EventType::PlayerChangeName,
            EventData::PlayerChangeTeam(_) => EventType::PlayerChangeTeam,
            EventData::PlayerChangeRole(_) => EventType::PlayerChangeRole,
            EventData::ChatMessage(_) => EventType::ChatMessage,
            EventData::WeaponFire(_) => EventType::WeaponFire,
            EventData::WeaponHit(_) => EventType::WeaponHit,
            EventData::ActionPlayer(_) => EventType::ActionPlayer,
            EventData::ActionTeam(_) => EventType::ActionTeam,
            EventData::ActionPlayerPlayer(_) => EventType::ActionPlayerPlayer,
            EventData::RoundStart(_) => EventType::RoundStart,
            EventData::RoundEnd(_) => EventType::RoundEnd,
            EventData::ServerAuthenticated(_) => EventType::ServerAuthenticated,
        }
    }
}

// ============================================================================
// Event Header
// ============================================================================

/// The player identity as parsed from the raw log line, before resolution
/// to a durable player record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

/// A fully-typed telemetry event: common header plus tagged payload.
///
/// Events are value objects. The queue consumer creates them, the bus and
/// handlers read them; nothing mutates an event after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    #[serde(flatten)]
    pub data: EventData,
    /// Wall-clock time of the originating log line.
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "serverId")]
    pub server_id: ServerId,
    /// Idempotency key assigned by the ingest side; see [`is_valid_event_id`].
    #[serde(rename = "eventId", default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(rename = "correlationId", default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<EventMeta>,
}

impl GameEvent {
    /// Builds an event with just the required header fields.
    pub fn new(server_id: ServerId, timestamp: DateTime<Utc>, data: EventData) -> Self {
        Self {
            data,
            timestamp,
            server_id,
            event_id: None,
            correlation_id: None,
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: EventMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn event_type(&self) -> EventType {
        self.data.event_type()
    }

    /// Deserializes a queue message payload.
    pub fn from_json(bytes: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(bytes).map_err(EventError::Deserialization)
    }

    /// Serializes into the queue message format.
    pub fn to_json(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(EventError::Serialization)
    }
}

/// Checks an idempotency key against `^msg_[a-z0-9]+_[a-f0-9]{16}$`.
pub fn is_valid_event_id(id: &str) -> bool {
    is_valid_tagged_id(id, "msg_", 16)
}

/// Checks a correlation id against `^corr_[a-z0-9]+_[a-f0-9]{12}$`.
pub fn is_valid_correlation_id(id: &str) -> bool {
    is_valid_tagged_id(id, "corr_", 12)
}

fn is_valid_tagged_id(id: &str, prefix: &str, hex_len: usize) -> bool {
    let Some(rest) = id.strip_prefix(prefix) else {
        return false;
    };
    let Some((middle, hex)) = rest.rsplit_once('_') else {
        return false;
    };
    !middle.is_empty()
        && middle.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        && hex.len() == hex_len
        && hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

// ============================================================================
// Handler Abstractions
// ============================================================================

/// Classification of a handler failure, used by the queue consumer to decide
/// between redelivery and dead-lettering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Permanently invalid input; retrying cannot succeed.
    Validation,
    /// Infrastructure hiccup (persistence, RCON transport); retry may succeed.
    Transient,
}

/// A structured handler failure. Handlers never panic or return raw errors
/// to the bus; they convert everything into this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerFailure {
    pub message: String,
    pub kind: FailureKind,
}

/// Outcome of a single handler invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerResult {
    pub success: bool,
    /// Number of records touched (sessions, player rows, event rows).
    pub affected: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<HandlerFailure>,
}

impl HandlerResult {
    pub fn ok() -> Self {
        Self { success: true, affected: 0, error: None }
    }

    pub fn ok_with(affected: u64) -> Self {
        Self { success: true, affected, error: None }
    }

    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            affected: 0,
            error: Some(HandlerFailure { message: message.into(), kind }),
        }
    }
}

/// Trait implemented by every event handler the bus dispatches to.
///
/// Handlers are side-effecting and may suspend on I/O; the bus awaits each
/// one to completion before invoking the next handler of the same emit.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Processes one event. Must not panic; convert failures into the
    /// structured result.
    async fn handle(&self, event: &GameEvent) -> HandlerResult;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Wraps a synchronous closure as an [`EventHandler`]. Used by tests and by
/// small glue handlers that do no I/O.
pub struct FnEventHandler<F> {
    name: String,
    f: F,
}

impl<F> FnEventHandler<F>
where
    F: Fn(&GameEvent) -> HandlerResult + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

#[async_trait]
impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&GameEvent) -> HandlerResult + Send + Sync + 'static,
{
    async fn handle(&self, event: &GameEvent) -> HandlerResult {
        (self.f)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during event bus operations.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Serialization failed when converting an event to bytes
    #[error("Serialization error: {0}")]
    Serialization(serde_json::Error),
    /// Deserialization failed when converting bytes to an event
    #[error("Deserialization error: {0}")]
    Deserialization(serde_json::Error),
    /// No handler is registered under the given id
    #[error("Unknown handler id: {0}")]
    UnknownHandler(String),
    /// Handler execution failed during event processing
    #[error("Handler execution error: {0}")]
    HandlerExecution(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_event() -> GameEvent {
        GameEvent::new(
            ServerId(1),
            Utc.with_ymd_and_hms(2024, 3, 1, 18, 22, 3).unwrap(),
            EventData::PlayerConnect(ConnectData {
                game_user_id: 10,
                ip_address: Some("203.0.113.7".to_string()),
            }),
        )
        .with_meta(EventMeta {
            steam_id: Some("STEAM_0:1:123456".to_string()),
            player_name: Some("TestPlayer".to_string()),
            is_bot: false,
        })
        .with_event_id("msg_lv3k2p_0123456789abcdef")
    }

    #[test]
    fn test_wire_format_round_trip() {
        let event = sample_event();
        let json = event.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();

        assert_eq!(value["eventType"], "PLAYER_CONNECT");
        assert_eq!(value["serverId"], 1);
        assert_eq!(value["data"]["gameUserId"], 10);
        assert_eq!(value["meta"]["steamId"], "STEAM_0:1:123456");

        let parsed = GameEvent::from_json(&json).unwrap();
        assert_eq!(parsed.event_type(), EventType::PlayerConnect);
        assert_eq!(parsed.server_id, ServerId(1));
        assert_eq!(parsed.event_id.as_deref(), Some("msg_lv3k2p_0123456789abcdef"));
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let json = br#"{"eventType":"PLAYER_TELEPORT","timestamp":"2024-03-01T18:22:03Z","serverId":1,"data":{}}"#;
        assert!(GameEvent::from_json(json).is_err());
    }

    #[test]
    fn test_event_type_wire_names() {
        assert_eq!(EventType::PlayerConnect.wire_name(), "PLAYER_CONNECT");
        assert_eq!(EventType::ActionPlayerPlayer.wire_name(), "ACTION_PLAYER_PLAYER");
        for event_type in EventType::ALL {
            let json = serde_json::to_string(&event_type).unwrap();
            assert_eq!(json, format!("\"{}\"", event_type.wire_name()));
        }
    }

    #[test]
    fn test_queue_direct_split() {
        assert!(EventType::PlayerKill.is_queue_direct());
        assert!(EventType::WeaponFire.is_queue_direct());
        assert!(EventType::WeaponHit.is_queue_direct());
        assert!(!EventType::PlayerConnect.is_queue_direct());
        assert!(!EventType::ChatMessage.is_queue_direct());
    }

    #[test]
    fn test_event_id_validation() {
        assert!(is_valid_event_id("msg_lv3k2p_0123456789abcdef"));
        assert!(!is_valid_event_id("msg_lv3k2p_0123456789ABCDEF"));
        assert!(!is_valid_event_id("msg__0123456789abcdef"));
        assert!(!is_valid_event_id("msg_lv3k2p_0123"));
        assert!(!is_valid_event_id("corr_lv3k2p_0123456789abcdef"));

        assert!(is_valid_correlation_id("corr_abc123_0123456789ab"));
        assert!(!is_valid_correlation_id("corr_abc123_0123456789abcdef"));
    }

    #[test]
    fn test_missing_optional_header_fields() {
        let json = br#"{"eventType":"ROUND_START","timestamp":"2024-03-01T18:00:00Z","serverId":3,"data":{"map":"de_dust2"}}"#;
        let event = GameEvent::from_json(json).unwrap();
        assert!(event.event_id.is_none());
        assert!(event.correlation_id.is_none());
        assert!(event.meta.is_none());
        match &event.data {
            EventData::RoundStart(data) => assert_eq!(data.map.as_deref(), Some("de_dust2")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
