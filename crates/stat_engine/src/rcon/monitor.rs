//! RCON connection monitor.
//!
//! Periodically polls every candidate server (recently active with RCON
//! credentials, plus anything that authenticated since) and keeps
//! per-server health through the retry-backoff calculator. A
//! `SERVER_AUTHENTICATED` bus event triggers an immediate, non-blocking
//! connect and session synchronization instead of waiting for the next
//! sweep.

use crate::error::CoreResult;
use crate::rcon::backoff::{BackoffConfig, RetryBackoff};
use crate::rcon::client::RconService;
use crate::repository::ServerRepository;
use crate::session::{SessionService, SyncOptions};
use chrono::Utc;
use dashmap::DashMap;
use scorekeep_event_system::{EventBus, EventType, HandlerResult, ServerId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Monitor tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between status sweeps.
    pub poll_interval_secs: u64,
    pub backoff: BackoffConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            backoff: BackoffConfig::default(),
        }
    }
}

pub struct RconMonitor {
    rcon: Arc<dyn RconService>,
    servers: Arc<dyn ServerRepository>,
    sessions: Arc<SessionService>,
    backoff: RetryBackoff,
    config: MonitorConfig,
    /// Servers that authenticated since startup; swept even before they
    /// show recent activity in the repository.
    authenticated: DashMap<ServerId, ()>,
    /// Guards against duplicate enrichment when an authentication event
    /// races a sweep.
    enriching: DashMap<ServerId, ()>,
}

impl RconMonitor {
    pub fn new(
        rcon: Arc<dyn RconService>,
        servers: Arc<dyn ServerRepository>,
        sessions: Arc<SessionService>,
        config: MonitorConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            rcon,
            servers,
            sessions,
            backoff: RetryBackoff::new(config.backoff.clone()),
            config,
            authenticated: DashMap::new(),
            enriching: DashMap::new(),
        })
    }

    pub fn backoff(&self) -> &RetryBackoff {
        &self.backoff
    }

    /// Subscribes to `SERVER_AUTHENTICATED`: schedule an immediate connect
    /// and session synchronization without blocking the emitting task.
    pub async fn register_bus_handlers(self: &Arc<Self>, bus: &EventBus) -> String {
        let monitor = Arc::clone(self);
        bus.on_fn(
            EventType::ServerAuthenticated,
            "rcon_monitor_authenticated",
            move |event| {
                let monitor = Arc::clone(&monitor);
                let server_id = event.server_id;
                monitor.authenticated.insert(server_id, ());
                tokio::spawn(async move {
                    monitor.connect_and_sync(server_id).await;
                });
                HandlerResult::ok()
            },
        )
        .await
    }

    /// Connects and synchronizes one server; skips quietly if the server
    /// is already connected or another enrichment is in flight.
    pub async fn connect_and_sync(&self, server_id: ServerId) {
        if self.enriching.insert(server_id, ()).is_some() {
            debug!("Enrichment already in flight for server {}, skipping", server_id);
            return;
        }
        let result = self.connect_and_sync_inner(server_id).await;
        self.enriching.remove(&server_id);
        if let Err(err) = result {
            warn!("Connect-and-sync failed for server {}: {}", server_id, err);
            self.backoff.record_failure(server_id, Utc::now());
        }
    }

    async fn connect_and_sync_inner(&self, server_id: ServerId) -> CoreResult<()> {
        if self.rcon.is_connected(server_id).await {
            debug!("Server {} already connected, skipping re-enrichment", server_id);
            return Ok(());
        }
        self.rcon.connect(server_id).await?;
        self.sessions
            .synchronize_server_sessions(server_id, SyncOptions::default())
            .await?;
        self.backoff.record_success(server_id);
        info!("🔌 Server {} connected and synchronized", server_id);
        Ok(())
    }

    /// Sweeps until shutdown is signalled.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("RCON monitor shutting down");
                        break;
                    }
                }
                _ = interval.tick() => {
                    self.sweep().await;
                }
            }
        }
    }

    /// One pass over every candidate server, honoring the backoff filter.
    pub async fn sweep(&self) {
        let now = Utc::now();
        let mut candidates: Vec<ServerId> = match self.servers.find_active_servers_with_rcon().await
        {
            Ok(servers) => servers.into_iter().map(|s| s.server_id).collect(),
            Err(err) => {
                warn!("Failed to list candidate servers: {}", err);
                Vec::new()
            }
        };
        for entry in self.authenticated.iter() {
            if !candidates.contains(entry.key()) {
                candidates.push(*entry.key());
            }
        }
        candidates.sort();

        for server_id in candidates {
            if !self.backoff.should_retry(server_id, now) {
                debug!("Server {} is backing off, skipping", server_id);
                continue;
            }
            self.poll_server(server_id).await;
        }
    }

    async fn poll_server(&self, server_id: ServerId) {
        let result: CoreResult<()> = async {
            if !self.rcon.is_connected(server_id).await {
                self.rcon.connect(server_id).await?;
            }
            let status = self.rcon.get_status(server_id).await?;
            // Ground truth: everything the server lists is alive right now.
            for player in &status.player_list {
                self.sessions.store().touch(server_id, player.userid);
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => self.backoff.record_success(server_id),
            Err(err) => {
                warn!("Status poll failed for server {}: {}", server_id, err);
                self.backoff.record_failure(server_id, Utc::now());
                // Tear down the connection and the sessions tracked for it;
                // a later successful sweep rebuilds both.
                let _ = self.rcon.disconnect(server_id).await;
                let cleared = self.sessions.clear_server_sessions(server_id);
                if cleared > 0 {
                    debug!("Cleared {} sessions after losing server {}", cleared, server_id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryPlayerRepository, InMemoryServerRepository, StaticRconService};
    use crate::rcon::{RconPlayer, RconStatus};
    use crate::resolver::PlayerResolver;
    use crate::session::SessionStore;
    use scorekeep_event_system::{EventData, GameEvent, ServerAuthenticatedData};
    use std::time::Duration;

    struct Fixture {
        servers: Arc<InMemoryServerRepository>,
        rcon: Arc<StaticRconService>,
        sessions: Arc<SessionService>,
        monitor: Arc<RconMonitor>,
    }

    fn fixture() -> Fixture {
        let players = Arc::new(InMemoryPlayerRepository::new());
        let servers = Arc::new(InMemoryServerRepository::new());
        let rcon = Arc::new(StaticRconService::new());
        let resolver = Arc::new(PlayerResolver::new(players.clone()));
        let sessions = Arc::new(SessionService::new(
            Arc::new(SessionStore::new()),
            resolver,
            rcon.clone(),
            servers.clone(),
            players,
        ));
        let monitor = RconMonitor::new(
            rcon.clone(),
            servers.clone(),
            sessions.clone(),
            MonitorConfig::default(),
        );
        Fixture { servers, rcon, sessions, monitor }
    }

    fn one_player_status() -> RconStatus {
        RconStatus {
            map: Some("de_dust2".to_string()),
            players: 1,
            max_players: 16,
            uptime_secs: Some(60),
            fps: Some(100.0),
            timestamp: Utc::now(),
            player_list: vec![RconPlayer {
                name: "Lurker".to_string(),
                userid: 4,
                uniqueid: "STEAM_0:1:424242".to_string(),
                is_bot: false,
                frag: 3,
                ping: 30,
                loss: 0,
                address: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_authentication_event_triggers_connect_and_sync() {
        let f = fixture();
        f.servers.add_server(ServerId(3), "auth", "cstrike");
        f.rcon.set_status(ServerId(3), one_player_status());

        let bus = EventBus::new();
        f.monitor.register_bus_handlers(&bus).await;

        let event = GameEvent::new(
            ServerId(3),
            Utc::now(),
            EventData::ServerAuthenticated(ServerAuthenticatedData { address: None }),
        );
        bus.emit(&event).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(f.rcon.is_connected(ServerId(3)).await);
        assert!(f.sessions.get_session_by_game_user_id(ServerId(3), 4).is_some());
    }

    #[tokio::test]
    async fn test_already_connected_server_skips_re_enrichment() {
        let f = fixture();
        f.servers.add_server(ServerId(3), "auth", "cstrike");
        f.rcon.set_status(ServerId(3), one_player_status());
        f.rcon.connect(ServerId(3)).await.unwrap();

        f.monitor.connect_and_sync(ServerId(3)).await;

        // No synchronization happened: the session set stays empty.
        assert!(f.sessions.get_session_by_game_user_id(ServerId(3), 4).is_none());
    }

    #[tokio::test]
    async fn test_sweep_honors_backoff_filter() {
        let f = fixture();
        f.servers.add_server(ServerId(7), "flaky", "cstrike");
        f.rcon.set_fail_server(ServerId(7), true);

        f.monitor.sweep().await;
        let attempts_after_first = f.rcon.connect_attempts(ServerId(7));
        assert_eq!(attempts_after_first, 1);

        // The server is now backing off; an immediate second sweep skips it.
        f.monitor.sweep().await;
        assert_eq!(f.rcon.connect_attempts(ServerId(7)), attempts_after_first);

        let state = f.monitor.backoff().state_of(ServerId(7)).unwrap();
        assert_eq!(state.consecutive_failures, 1);
    }

    #[tokio::test]
    async fn test_poll_failure_clears_sessions() {
        let f = fixture();
        f.servers.add_server(ServerId(5), "dying", "cstrike");
        f.rcon.set_status(ServerId(5), one_player_status());

        // First sweep builds the connection; sync it manually for sessions.
        f.monitor.connect_and_sync(ServerId(5)).await;
        assert!(f.sessions.get_session_by_game_user_id(ServerId(5), 4).is_some());

        // Server dies; the next sweep records the failure and clears state.
        f.rcon.set_fail_server(ServerId(5), true);
        f.monitor.sweep().await;

        assert!(!f.rcon.is_connected(ServerId(5)).await);
        assert!(f.sessions.get_session_by_game_user_id(ServerId(5), 4).is_none());
        assert!(f.monitor.backoff().state_of(ServerId(5)).is_some());
    }

    #[tokio::test]
    async fn test_sweep_touches_live_sessions() {
        let f = fixture();
        f.servers.add_server(ServerId(5), "alive", "cstrike");
        f.rcon.set_status(ServerId(5), one_player_status());
        f.monitor.connect_and_sync(ServerId(5)).await;

        let before = f.sessions.get_session_by_game_user_id(ServerId(5), 4).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        f.monitor.sweep().await;
        let after = f.sessions.get_session_by_game_user_id(ServerId(5), 4).unwrap();

        assert!(after.last_seen >= before.last_seen);
    }
}
