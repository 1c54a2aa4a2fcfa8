//! In-memory collaborator implementations.
//!
//! These back the standalone daemon mode and the test suite. They honor
//! the same contracts a database-backed implementation would: the
//! `(uniqueId, game)` unique constraint, monotonic player ids, atomic
//! counter increments, and the distinguishable out-of-range error on
//! unsigned skill underflow.

use crate::error::{CoreError, CoreResult};
use crate::notify::NotificationConfig;
use crate::rcon::{RconService, RconStatus};
use crate::repository::{
    AuditEventRow, ChatEventRow, ConnectEventRow, DisconnectEventRow, FragEventRow, NewPlayer,
    PlayerRecord, PlayerRepository, PlayerStatsUpdate, PlayerUniqueId, ServerRecord,
    ServerRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use scorekeep_event_system::{PlayerId, ServerId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

const DEFAULT_SKILL: u32 = 1000;
const DEFAULT_CONFIDENCE: f64 = 350.0;
const DEFAULT_VOLATILITY: f64 = 0.06;

#[derive(Debug, Clone)]
struct StoredConnect {
    row: ConnectEventRow,
    disconnect_time: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct PlayersInner {
    players: HashMap<PlayerId, PlayerRecord>,
    by_unique: HashMap<(String, String), PlayerId>,
    next_id: i64,
    connect_rows: Vec<StoredConnect>,
    disconnect_rows: Vec<DisconnectEventRow>,
    chat_rows: Vec<ChatEventRow>,
    frag_rows: Vec<FragEventRow>,
    audit_rows: Vec<AuditEventRow>,
}

/// Player persistence backed by a process-local map.
pub struct InMemoryPlayerRepository {
    inner: Mutex<PlayersInner>,
    fail_updates: AtomicBool,
}

impl InMemoryPlayerRepository {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PlayersInner { next_id: 0, ..Default::default() }),
            fail_updates: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent `update` fail with a transient repository
    /// error; used to exercise redelivery paths.
    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn player_count(&self) -> usize {
        self.inner.lock().unwrap().players.len()
    }

    pub fn frag_row_count(&self) -> usize {
        self.inner.lock().unwrap().frag_rows.len()
    }

    pub fn chat_rows(&self) -> Vec<ChatEventRow> {
        self.inner.lock().unwrap().chat_rows.clone()
    }

    pub fn audit_rows(&self) -> Vec<AuditEventRow> {
        self.inner.lock().unwrap().audit_rows.clone()
    }

    pub fn disconnect_rows(&self) -> Vec<DisconnectEventRow> {
        self.inner.lock().unwrap().disconnect_rows.clone()
    }

    pub fn connect_rows(&self) -> Vec<(ConnectEventRow, Option<DateTime<Utc>>)> {
        self.inner
            .lock()
            .unwrap()
            .connect_rows
            .iter()
            .map(|stored| (stored.row.clone(), stored.disconnect_time))
            .collect()
    }
}

impl Default for InMemoryPlayerRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlayerRepository for InMemoryPlayerRepository {
    async fn find_by_id(&self, id: PlayerId) -> CoreResult<Option<PlayerRecord>> {
        Ok(self.inner.lock().unwrap().players.get(&id).cloned())
    }

    async fn find_by_unique_id(
        &self,
        unique_id: &str,
        game: &str,
    ) -> CoreResult<Option<PlayerRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .by_unique
            .get(&(unique_id.to_string(), game.to_string()))
            .and_then(|id| inner.players.get(id))
            .cloned())
    }

    async fn upsert_player(&self, new_player: NewPlayer) -> CoreResult<PlayerId> {
        let mut inner = self.inner.lock().unwrap();
        let key = (new_player.unique_id.clone(), new_player.game.clone());
        if let Some(existing) = inner.by_unique.get(&key) {
            return Ok(*existing);
        }

        inner.next_id += 1;
        let player_id = PlayerId(inner.next_id);
        let record = PlayerRecord {
            player_id,
            last_name: new_player.last_name,
            game: new_player.game.clone(),
            skill: DEFAULT_SKILL,
            confidence: DEFAULT_CONFIDENCE,
            volatility: DEFAULT_VOLATILITY,
            kills: 0,
            deaths: 0,
            suicides: 0,
            teamkills: 0,
            headshots: 0,
            shots: 0,
            hits: 0,
            connection_time: 0,
            kill_streak: 0,
            death_streak: 0,
            last_event: Utc::now().timestamp(),
            unique_ids: vec![PlayerUniqueId {
                unique_id: new_player.unique_id,
                game: new_player.game,
            }],
        };
        inner.players.insert(player_id, record);
        inner.by_unique.insert(key, player_id);
        Ok(player_id)
    }

    async fn update(&self, id: PlayerId, update: PlayerStatsUpdate) -> CoreResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(CoreError::repository("simulated persistence outage"));
        }
        let mut inner = self.inner.lock().unwrap();
        let player = inner
            .players
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(format!("player {id}")))?;

        // Range check before any mutation so a rejected update is atomic.
        let new_skill = player.skill as i64 + update.skill_delta as i64;
        if new_skill < 0 {
            return Err(CoreError::out_of_range(format!(
                "skill for player {id} would be {new_skill}"
            )));
        }

        player.skill = new_skill as u32;
        player.kills += update.kills;
        player.deaths += update.deaths;
        player.suicides += update.suicides;
        player.teamkills += update.teamkills;
        player.headshots += update.headshots;
        player.shots += update.shots;
        player.hits += update.hits;
        player.connection_time += update.connection_time;
        if let Some(streak) = update.set_kill_streak {
            player.kill_streak = streak;
        }
        if let Some(streak) = update.set_death_streak {
            player.death_streak = streak;
        }
        if let Some(name) = update.set_last_name {
            player.last_name = name;
        }
        if let Some(last_event) = update.last_event {
            player.last_event = last_event;
        }
        Ok(())
    }

    async fn get_player_stats(&self, id: PlayerId) -> CoreResult<Option<PlayerRecord>> {
        self.find_by_id(id).await
    }

    async fn get_player_stats_batch(&self, ids: &[PlayerId]) -> CoreResult<Vec<PlayerRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(ids.iter().filter_map(|id| inner.players.get(id).cloned()).collect())
    }

    async fn update_player_stats_batch(&self, updates: &[(PlayerId, i32)]) -> CoreResult<()> {
        for (id, skill_delta) in updates {
            self.update(
                *id,
                PlayerStatsUpdate { skill_delta: *skill_delta, ..Default::default() },
            )
            .await?;
        }
        Ok(())
    }

    async fn create_connect_event(&self, row: ConnectEventRow) -> CoreResult<()> {
        self.inner
            .lock()
            .unwrap()
            .connect_rows
            .push(StoredConnect { row, disconnect_time: None });
        Ok(())
    }

    async fn create_disconnect_event(&self, row: DisconnectEventRow) -> CoreResult<()> {
        self.inner.lock().unwrap().disconnect_rows.push(row);
        Ok(())
    }

    async fn close_recent_connect(
        &self,
        server_id: ServerId,
        player_id: PlayerId,
        disconnect_time: DateTime<Utc>,
    ) -> CoreResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let open = inner
            .connect_rows
            .iter_mut()
            .rev()
            .find(|stored| {
                stored.row.server_id == server_id
                    && stored.row.player_id == player_id
                    && stored.disconnect_time.is_none()
            });
        match open {
            Some(stored) => {
                stored.disconnect_time = Some(disconnect_time);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn has_recent_connect(
        &self,
        server_id: ServerId,
        player_id: PlayerId,
        within: Duration,
    ) -> CoreResult<bool> {
        let cutoff = Utc::now() - within;
        let inner = self.inner.lock().unwrap();
        Ok(inner.connect_rows.iter().any(|stored| {
            stored.row.server_id == server_id
                && stored.row.player_id == player_id
                && stored.row.event_time >= cutoff
        }))
    }

    async fn create_chat_event(&self, row: ChatEventRow) -> CoreResult<()> {
        self.inner.lock().unwrap().chat_rows.push(row);
        Ok(())
    }

    async fn log_event_frag(&self, row: FragEventRow) -> CoreResult<()> {
        self.inner.lock().unwrap().frag_rows.push(row);
        Ok(())
    }

    async fn log_audit_event(&self, row: AuditEventRow) -> CoreResult<()> {
        self.inner.lock().unwrap().audit_rows.push(row);
        Ok(())
    }

    async fn find_top_players(&self, game: &str, limit: usize) -> CoreResult<Vec<PlayerRecord>> {
        let inner = self.inner.lock().unwrap();
        let mut players: Vec<PlayerRecord> = inner
            .players
            .values()
            .filter(|p| p.game == game)
            .cloned()
            .collect();
        players.sort_by(|a, b| b.skill.cmp(&a.skill).then(a.player_id.0.cmp(&b.player_id.0)));
        players.truncate(limit);
        Ok(players)
    }
}

#[derive(Default)]
struct ServersInner {
    servers: HashMap<ServerId, ServerRecord>,
    config: HashMap<(ServerId, String), String>,
    notify: HashMap<ServerId, NotificationConfig>,
}

/// Server lookups and config flags backed by a process-local map.
pub struct InMemoryServerRepository {
    inner: Mutex<ServersInner>,
    fail_notification_config: AtomicBool,
}

impl InMemoryServerRepository {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ServersInner::default()),
            fail_notification_config: AtomicBool::new(false),
        }
    }

    pub fn add_server(&self, id: ServerId, name: &str, game: &str) {
        self.inner.lock().unwrap().servers.insert(
            id,
            ServerRecord {
                server_id: id,
                name: name.to_string(),
                game: game.to_string(),
                address: "127.0.0.1".to_string(),
                port: 27015,
                has_rcon: true,
                last_event: Utc::now().timestamp(),
                active_map: None,
            },
        );
    }

    pub fn set_config(&self, id: ServerId, key: &str, value: &str) {
        self.inner
            .lock()
            .unwrap()
            .config
            .insert((id, key.to_string()), value.to_string());
    }

    pub fn set_active_map(&self, id: ServerId, map: &str) {
        if let Some(server) = self.inner.lock().unwrap().servers.get_mut(&id) {
            server.active_map = Some(map.to_string());
        }
    }

    pub fn set_notification_config(&self, id: ServerId, config: NotificationConfig) {
        self.inner.lock().unwrap().notify.insert(id, config);
    }

    /// Makes `notification_config` fail, exercising the dispatcher's
    /// fail-open path.
    pub fn set_fail_notification_config(&self, fail: bool) {
        self.fail_notification_config.store(fail, Ordering::SeqCst);
    }
}

impl Default for InMemoryServerRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServerRepository for InMemoryServerRepository {
    async fn find_by_id(&self, id: ServerId) -> CoreResult<Option<ServerRecord>> {
        Ok(self.inner.lock().unwrap().servers.get(&id).cloned())
    }

    async fn find_active_servers_with_rcon(&self) -> CoreResult<Vec<ServerRecord>> {
        let inner = self.inner.lock().unwrap();
        let mut servers: Vec<ServerRecord> =
            inner.servers.values().filter(|s| s.has_rcon).cloned().collect();
        servers.sort_by_key(|s| s.server_id);
        Ok(servers)
    }

    async fn find_servers_by_ids(&self, ids: &[ServerId]) -> CoreResult<Vec<ServerRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(ids.iter().filter_map(|id| inner.servers.get(id).cloned()).collect())
    }

    async fn get_server_game(&self, id: ServerId) -> CoreResult<String> {
        self.inner
            .lock()
            .unwrap()
            .servers
            .get(&id)
            .map(|s| s.game.clone())
            .ok_or_else(|| CoreError::not_found(format!("server {id}")))
    }

    async fn get_config_bool(&self, id: ServerId, key: &str, default: bool) -> CoreResult<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .config
            .get(&(id, key.to_string()))
            .map(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
            .unwrap_or(default))
    }

    async fn get_config_string(&self, id: ServerId, key: &str) -> CoreResult<Option<String>> {
        Ok(self.inner.lock().unwrap().config.get(&(id, key.to_string())).cloned())
    }

    async fn notification_config(&self, id: ServerId) -> CoreResult<NotificationConfig> {
        if self.fail_notification_config.load(Ordering::SeqCst) {
            return Err(CoreError::repository("notification config unavailable"));
        }
        Ok(self
            .inner
            .lock()
            .unwrap()
            .notify
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_active_map(&self, id: ServerId) -> CoreResult<Option<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .servers
            .get(&id)
            .and_then(|s| s.active_map.clone()))
    }
}

/// Scripted RCON endpoint: statuses are set by tests (or a dev config) and
/// outgoing commands are recorded instead of hitting a real game server.
pub struct StaticRconService {
    connected: DashMap<ServerId, ()>,
    statuses: Mutex<HashMap<ServerId, RconStatus>>,
    commands: Mutex<Vec<(ServerId, String)>>,
    fail_servers: DashMap<ServerId, ()>,
    fail_commands: AtomicBool,
    connect_attempts: DashMap<ServerId, AtomicU32>,
}

impl StaticRconService {
    pub fn new() -> Self {
        Self {
            connected: DashMap::new(),
            statuses: Mutex::new(HashMap::new()),
            commands: Mutex::new(Vec::new()),
            fail_servers: DashMap::new(),
            fail_commands: AtomicBool::new(false),
            connect_attempts: DashMap::new(),
        }
    }

    pub fn set_status(&self, server_id: ServerId, status: RconStatus) {
        self.statuses.lock().unwrap().insert(server_id, status);
    }

    /// Makes connect/status fail for one server.
    pub fn set_fail_server(&self, server_id: ServerId, fail: bool) {
        if fail {
            self.fail_servers.insert(server_id, ());
        } else {
            self.fail_servers.remove(&server_id);
        }
    }

    /// Makes every outgoing command fail with a transport error.
    pub fn set_fail_commands(&self, fail: bool) {
        self.fail_commands.store(fail, Ordering::SeqCst);
    }

    pub fn commands(&self) -> Vec<(ServerId, String)> {
        self.commands.lock().unwrap().clone()
    }

    pub fn command_count(&self) -> usize {
        self.commands.lock().unwrap().len()
    }

    pub fn connect_attempts(&self, server_id: ServerId) -> u32 {
        self.connect_attempts
            .get(&server_id)
            .map(|counter| counter.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

impl Default for StaticRconService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RconService for StaticRconService {
    async fn is_connected(&self, server_id: ServerId) -> bool {
        self.connected.contains_key(&server_id)
    }

    async fn connect(&self, server_id: ServerId) -> CoreResult<()> {
        self.connect_attempts
            .entry(server_id)
            .or_insert_with(|| AtomicU32::new(0))
            .fetch_add(1, Ordering::SeqCst);
        if self.fail_servers.contains_key(&server_id) {
            return Err(CoreError::rcon(format!("connection refused by server {server_id}")));
        }
        self.connected.insert(server_id, ());
        Ok(())
    }

    async fn disconnect(&self, server_id: ServerId) -> CoreResult<()> {
        self.connected.remove(&server_id);
        Ok(())
    }

    async fn get_status(&self, server_id: ServerId) -> CoreResult<RconStatus> {
        if self.fail_servers.contains_key(&server_id) {
            return Err(CoreError::rcon(format!("status timed out for server {server_id}")));
        }
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(&server_id)
            .cloned()
            .unwrap_or_else(RconStatus::empty))
    }

    async fn execute_command(&self, server_id: ServerId, raw: &str) -> CoreResult<String> {
        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(CoreError::rcon("command transport failure"));
        }
        self.commands.lock().unwrap().push((server_id, raw.to_string()));
        Ok(String::new())
    }
}
