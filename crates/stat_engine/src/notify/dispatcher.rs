//! Event-gated notification dispatch.
//!
//! Each per-event method checks the server's notification config (cached
//! with a TTL; fail-open when the config cannot be loaded, since operator
//! visibility beats strict gating), builds a structured command, and sends
//! it over RCON. Transport errors are logged and swallowed: notifications
//! are lossy by design and never cascade into handler failure.

use crate::rcon::RconService;
use crate::repository::ServerRepository;
use super::command::{CommandBuilder, BROADCAST_TARGET};
use super::NotificationConfig;
use dashmap::DashMap;
use scorekeep_event_system::{EventType, ServerId};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const DEFAULT_CONFIG_TTL: Duration = Duration::from_secs(60);

struct CachedConfig {
    config: NotificationConfig,
    loaded_at: Instant,
}

pub struct NotificationDispatcher {
    rcon: Arc<dyn RconService>,
    servers: Arc<dyn ServerRepository>,
    cache: DashMap<ServerId, CachedConfig>,
    ttl: Duration,
}

impl NotificationDispatcher {
    pub fn new(rcon: Arc<dyn RconService>, servers: Arc<dyn ServerRepository>) -> Self {
        Self::with_ttl(rcon, servers, DEFAULT_CONFIG_TTL)
    }

    pub fn with_ttl(
        rcon: Arc<dyn RconService>,
        servers: Arc<dyn ServerRepository>,
        ttl: Duration,
    ) -> Self {
        Self {
            rcon,
            servers,
            cache: DashMap::new(),
            ttl,
        }
    }

    async fn config_for(&self, server_id: ServerId) -> NotificationConfig {
        if let Some(cached) = self.cache.get(&server_id) {
            if cached.loaded_at.elapsed() < self.ttl {
                return cached.config.clone();
            }
        }
        match self.servers.notification_config(server_id).await {
            Ok(mut config) => {
                // The command prefix is per-server configuration.
                match self
                    .servers
                    .get_config_string(server_id, "BroadcastEventsCommand")
                    .await
                {
                    Ok(Some(prefix)) => config.command_prefix = prefix,
                    Ok(None) => {}
                    Err(err) => warn!(
                        "Failed to read BroadcastEventsCommand for server {}: {}",
                        server_id, err
                    ),
                }
                self.cache.insert(
                    server_id,
                    CachedConfig { config: config.clone(), loaded_at: Instant::now() },
                );
                config
            }
            Err(err) => {
                // Fail open: a broken config row must not silence the server.
                warn!(
                    "Failed to load notification config for server {}, defaulting to enabled: {}",
                    server_id, err
                );
                NotificationConfig::default()
            }
        }
    }

    async fn send(&self, server_id: ServerId, command: String) {
        debug!("📤 RCON notify server {}: {}", server_id, command);
        if let Err(err) = self.rcon.execute_command(server_id, &command).await {
            warn!("Notification delivery failed for server {}: {}", server_id, err);
        }
    }

    /// Kill announcement with both players' skill movement.
    #[allow(clippy::too_many_arguments)]
    pub async fn notify_kill_event(
        &self,
        server_id: ServerId,
        killer_name: &str,
        killer_skill: u32,
        killer_change: i32,
        victim_name: &str,
        victim_skill: u32,
        victim_change: i32,
        weapon: &str,
        headshot: bool,
    ) {
        let config = self.config_for(server_id).await;
        if !config.is_enabled(EventType::PlayerKill) {
            return;
        }
        let command = CommandBuilder::new(&config.command_prefix, BROADCAST_TARGET, "KILL")
            .arg_str(killer_name)
            .arg_uint(killer_skill as u64)
            .arg_int(killer_change as i64)
            .arg_str(victim_name)
            .arg_uint(victim_skill as u64)
            .arg_int(victim_change as i64)
            .arg_str(weapon)
            .arg_bool(headshot)
            .build();
        self.send(server_id, command).await;
    }

    pub async fn notify_connect_event(
        &self,
        server_id: ServerId,
        player_name: &str,
        country: Option<&str>,
    ) {
        let config = self.config_for(server_id).await;
        if !config.is_enabled(EventType::PlayerConnect) {
            return;
        }
        let command = CommandBuilder::new(&config.command_prefix, BROADCAST_TARGET, "CONNECT")
            .arg_str(player_name)
            .arg_opt_str(country)
            .build();
        self.send(server_id, command).await;
    }

    pub async fn notify_disconnect_event(
        &self,
        server_id: ServerId,
        player_name: &str,
        reason: Option<&str>,
        country: Option<&str>,
        session_secs: i64,
    ) {
        let config = self.config_for(server_id).await;
        if !config.is_enabled(EventType::PlayerDisconnect) {
            return;
        }
        let command = CommandBuilder::new(&config.command_prefix, BROADCAST_TARGET, "DISCONNECT")
            .arg_str(player_name)
            .arg_opt_str(reason)
            .arg_opt_str(country)
            .arg_int(session_secs)
            .build();
        self.send(server_id, command).await;
    }

    pub async fn notify_suicide_event(
        &self,
        server_id: ServerId,
        player_name: &str,
        weapon: Option<&str>,
        penalty: i32,
    ) {
        let config = self.config_for(server_id).await;
        if !config.is_enabled(EventType::PlayerSuicide) {
            return;
        }
        let command = CommandBuilder::new(&config.command_prefix, BROADCAST_TARGET, "SUICIDE")
            .arg_str(player_name)
            .arg_opt_str(weapon)
            .arg_int(penalty as i64)
            .build();
        self.send(server_id, command).await;
    }

    pub async fn notify_teamkill_event(
        &self,
        server_id: ServerId,
        killer_name: &str,
        victim_name: &str,
        weapon: &str,
    ) {
        let config = self.config_for(server_id).await;
        if !config.is_enabled(EventType::PlayerTeamkill) {
            return;
        }
        let command = CommandBuilder::new(&config.command_prefix, BROADCAST_TARGET, "TEAMKILL")
            .arg_str(killer_name)
            .arg_str(victim_name)
            .arg_str(weapon)
            .build();
        self.send(server_id, command).await;
    }

    /// Rank response addressed to one game slot.
    pub async fn send_rank(
        &self,
        server_id: ServerId,
        target: u32,
        player_name: &str,
        rank: u32,
        total: u32,
        skill: u32,
    ) {
        let config = self.config_for(server_id).await;
        let command = CommandBuilder::new(&config.command_prefix, target, "RANK")
            .arg_str(player_name)
            .arg_uint(rank as u64)
            .arg_uint(total as u64)
            .arg_uint(skill as u64)
            .build();
        self.send(server_id, command).await;
    }

    /// Stats response addressed to one game slot; KDR formatted to two
    /// decimals.
    #[allow(clippy::too_many_arguments)]
    pub async fn send_stats(
        &self,
        server_id: ServerId,
        target: u32,
        player_name: &str,
        skill: u32,
        kills: u64,
        deaths: u64,
        kdr: f64,
    ) {
        let config = self.config_for(server_id).await;
        let command = CommandBuilder::new(&config.command_prefix, target, "STATS")
            .arg_str(player_name)
            .arg_uint(skill as u64)
            .arg_uint(kills)
            .arg_uint(deaths)
            .arg_ratio(kdr)
            .build();
        self.send(server_id, command).await;
    }

    /// Session summary addressed to one game slot.
    pub async fn send_session(
        &self,
        server_id: ServerId,
        target: u32,
        player_name: &str,
        session_secs: i64,
        session_kills: u64,
    ) {
        let config = self.config_for(server_id).await;
        let command = CommandBuilder::new(&config.command_prefix, target, "SESSION")
            .arg_str(player_name)
            .arg_int(session_secs)
            .arg_uint(session_kills)
            .build();
        self.send(server_id, command).await;
    }

    /// Free-text message to one game slot, or everyone with target 0.
    pub async fn send_message(&self, server_id: ServerId, target: u32, message: &str) {
        let config = self.config_for(server_id).await;
        let command = CommandBuilder::new(&config.command_prefix, target, "MESSAGE")
            .arg_str(message)
            .build();
        self.send(server_id, command).await;
    }

    /// Server-wide announcement. Uses the dedicated announce prefix when
    /// the server configures one.
    pub async fn send_announce(&self, server_id: ServerId, message: &str) {
        let config = self.config_for(server_id).await;
        let prefix = match self
            .servers
            .get_config_string(server_id, "BroadcastEventsCommandAnnounce")
            .await
        {
            Ok(Some(prefix)) => prefix,
            _ => config.command_prefix.clone(),
        };
        let command = CommandBuilder::new(&prefix, BROADCAST_TARGET, "ANNOUNCE")
            .arg_str(message)
            .build();
        self.send(server_id, command).await;
    }
}
