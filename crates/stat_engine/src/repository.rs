//! Persistence contracts consumed by the processing core.
//!
//! The core never talks to a database directly; it goes through these
//! traits and holds no long-lived references to records, always resolving
//! by ID at the point of use. Counter updates use increment semantics so
//! concurrent handlers compose without read-modify-write races.
//!
//! The persistence layer is assumed to enforce the `(uniqueId, game)`
//! unique constraint, issue monotonic player ids, and raise the
//! distinguishable out-of-range error on unsigned-counter underflow
//! ([`CoreError::out_of_range`]).

use crate::error::CoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use scorekeep_event_system::{PlayerId, Position, ServerId};
use serde::{Deserialize, Serialize};

/// One `(uniqueId, game) → player` mapping row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerUniqueId {
    pub unique_id: String,
    pub game: String,
}

/// A durable player record with rating fields and lifetime counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub player_id: PlayerId,
    /// Most recently seen display name.
    pub last_name: String,
    pub game: String,
    /// Rating; stored unsigned, clamped at zero on underflow.
    pub skill: u32,
    pub confidence: f64,
    pub volatility: f64,
    pub kills: u64,
    pub deaths: u64,
    pub suicides: u64,
    pub teamkills: u64,
    pub headshots: u64,
    pub shots: u64,
    pub hits: u64,
    /// Accumulated connected time in seconds.
    pub connection_time: i64,
    pub kill_streak: u32,
    pub death_streak: u32,
    /// Unix seconds of the last processed event for this player.
    pub last_event: i64,
    pub unique_ids: Vec<PlayerUniqueId>,
}

/// Input for the upsert-by-natural-key path.
#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub last_name: String,
    pub game: String,
    pub unique_id: String,
}

/// An incremental update to a player record.
///
/// Counter fields are deltas and must be non-negative; `skill_delta` is the
/// only signed delta. Streaks are explicit sets because they reset on the
/// complementary event rather than accumulate.
#[derive(Debug, Clone, Default)]
pub struct PlayerStatsUpdate {
    pub kills: u64,
    pub deaths: u64,
    pub suicides: u64,
    pub teamkills: u64,
    pub headshots: u64,
    pub shots: u64,
    pub hits: u64,
    pub skill_delta: i32,
    /// Seconds to add to `connection_time`.
    pub connection_time: i64,
    pub set_kill_streak: Option<u32>,
    pub set_death_streak: Option<u32>,
    pub set_last_name: Option<String>,
    /// Unix seconds; repositories normalize whatever representation their
    /// schema uses to this at the boundary.
    pub last_event: Option<i64>,
}

/// A persisted connect event.
#[derive(Debug, Clone)]
pub struct ConnectEventRow {
    pub server_id: ServerId,
    pub player_id: PlayerId,
    pub event_time: DateTime<Utc>,
    pub ip_address: Option<String>,
}

/// A persisted disconnect event.
#[derive(Debug, Clone)]
pub struct DisconnectEventRow {
    pub server_id: ServerId,
    pub player_id: PlayerId,
    pub event_time: DateTime<Utc>,
    pub reason: Option<String>,
    /// Whole seconds between the session's connect and last activity.
    pub session_duration: i64,
}

/// A persisted chat line.
#[derive(Debug, Clone)]
pub struct ChatEventRow {
    pub server_id: ServerId,
    pub player_id: PlayerId,
    pub event_time: DateTime<Utc>,
    pub map: Option<String>,
    pub message: String,
    pub message_mode: u8,
}

/// A persisted frag with its combat context.
#[derive(Debug, Clone)]
pub struct FragEventRow {
    pub server_id: ServerId,
    pub killer_id: PlayerId,
    pub victim_id: PlayerId,
    pub event_time: DateTime<Utc>,
    pub weapon: String,
    pub headshot: bool,
    pub map: Option<String>,
    pub killer_position: Option<Position>,
    pub victim_position: Option<Position>,
}

/// What an audit row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditKind {
    Entry,
    NameChange,
    TeamChange,
    RoleChange,
    Suicide,
    Teamkill,
    PlayerAction,
}

/// A persisted audit row for events that mutate no counters (team/role
/// changes) or need a trail next to their counter update.
#[derive(Debug, Clone)]
pub struct AuditEventRow {
    pub server_id: ServerId,
    pub player_id: PlayerId,
    pub event_time: DateTime<Utc>,
    pub kind: AuditKind,
    pub detail: String,
}

/// CRUD and event-row operations over durable players.
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    /// Loads a player with its unique-id rows.
    async fn find_by_id(&self, id: PlayerId) -> CoreResult<Option<PlayerRecord>>;

    /// Looks a player up by natural key.
    async fn find_by_unique_id(&self, unique_id: &str, game: &str)
        -> CoreResult<Option<PlayerRecord>>;

    /// Returns the existing player for `(unique_id, game)` or creates one
    /// with default rating and the unique-id row attached, in a single
    /// transaction. Duplicate creates racing at the storage level resolve
    /// to the same player.
    async fn upsert_player(&self, new_player: NewPlayer) -> CoreResult<PlayerId>;

    /// Applies an incremental update. Raises the distinguishable
    /// out-of-range error if `skill_delta` would drive `skill` below zero.
    async fn update(&self, id: PlayerId, update: PlayerStatsUpdate) -> CoreResult<()>;

    /// Stats snapshot used by the kill handler's skill calculation.
    async fn get_player_stats(&self, id: PlayerId) -> CoreResult<Option<PlayerRecord>>;

    /// Batch stats lookup; missing ids are silently absent from the result.
    async fn get_player_stats_batch(&self, ids: &[PlayerId]) -> CoreResult<Vec<PlayerRecord>>;

    /// Batch skill adjustment, `(player, skill delta)` pairs.
    async fn update_player_stats_batch(&self, updates: &[(PlayerId, i32)]) -> CoreResult<()>;

    async fn create_connect_event(&self, row: ConnectEventRow) -> CoreResult<()>;

    async fn create_disconnect_event(&self, row: DisconnectEventRow) -> CoreResult<()>;

    /// Best-effort backfill of the most recent open connect row with the
    /// disconnect time. Returns whether a row was closed.
    async fn close_recent_connect(
        &self,
        server_id: ServerId,
        player_id: PlayerId,
        disconnect_time: DateTime<Utc>,
    ) -> CoreResult<bool>;

    /// Whether a connect row exists for the player on the server within the
    /// given window.
    async fn has_recent_connect(
        &self,
        server_id: ServerId,
        player_id: PlayerId,
        within: Duration,
    ) -> CoreResult<bool>;

    async fn create_chat_event(&self, row: ChatEventRow) -> CoreResult<()>;

    async fn log_event_frag(&self, row: FragEventRow) -> CoreResult<()>;

    async fn log_audit_event(&self, row: AuditEventRow) -> CoreResult<()>;

    /// Players of a game ordered by descending skill.
    async fn find_top_players(&self, game: &str, limit: usize) -> CoreResult<Vec<PlayerRecord>>;
}

/// A game server known to the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRecord {
    pub server_id: ServerId,
    pub name: String,
    pub game: String,
    pub address: String,
    pub port: u16,
    pub has_rcon: bool,
    /// Unix seconds of the last event received from this server.
    pub last_event: i64,
    pub active_map: Option<String>,
}

/// Lookups and per-server configuration flags.
#[async_trait]
pub trait ServerRepository: Send + Sync {
    async fn find_by_id(&self, id: ServerId) -> CoreResult<Option<ServerRecord>>;

    /// Servers with recent activity and stored RCON credentials; the
    /// monitor's sweep candidates.
    async fn find_active_servers_with_rcon(&self) -> CoreResult<Vec<ServerRecord>>;

    async fn find_servers_by_ids(&self, ids: &[ServerId]) -> CoreResult<Vec<ServerRecord>>;

    async fn get_server_game(&self, id: ServerId) -> CoreResult<String>;

    /// Reads a boolean config flag (e.g. `IgnoreBots`), falling back to
    /// `default` when unset.
    async fn get_config_bool(&self, id: ServerId, key: &str, default: bool) -> CoreResult<bool>;

    /// Reads a string config value (e.g. `BroadcastEventsCommand`).
    async fn get_config_string(&self, id: ServerId, key: &str) -> CoreResult<Option<String>>;

    /// Loads the notification configuration for a server.
    async fn notification_config(
        &self,
        id: ServerId,
    ) -> CoreResult<crate::notify::NotificationConfig>;

    /// Current map as last reported by the server; used for chat rows.
    async fn get_active_map(&self, id: ServerId) -> CoreResult<Option<String>>;
}

impl PlayerStatsUpdate {
    /// An update that only bumps `last_event`.
    pub fn touch(now: i64) -> Self {
        Self { last_event: Some(now), ..Default::default() }
    }

    /// Returns a copy with `skill_delta` clamped so the resulting skill is
    /// exactly zero. Used for the underflow retry.
    pub fn with_skill_clamped_to_zero(&self, current_skill: u32) -> Self {
        let mut clamped = self.clone();
        clamped.skill_delta = -(current_skill as i32);
        clamped
    }
}

/// Applies `update`, retrying once with skill clamped to zero if the
/// persistence layer signals a numeric range violation.
pub async fn update_with_skill_clamp(
    players: &dyn PlayerRepository,
    id: PlayerId,
    current_skill: u32,
    update: PlayerStatsUpdate,
) -> CoreResult<()> {
    match players.update(id, update.clone()).await {
        Err(err) if err.is_out_of_range() => {
            tracing::warn!(
                "Skill underflow for player {}, clamping to zero (delta {})",
                id,
                update.skill_delta
            );
            players
                .update(id, update.with_skill_clamped_to_zero(current_skill))
                .await
        }
        other => other,
    }
}
