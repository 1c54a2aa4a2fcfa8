//! Main application logic and lifecycle management.
//!
//! Wires the event bus, the queue consumer, the session layer, and the
//! RCON monitor together, runs them until a shutdown signal arrives, and
//! drains everything gracefully.

use crate::{cli::CliArgs, config::AppConfig, logging::{display_banner, setup_logging}, signals};
use scorekeep_event_system::{create_event_bus, ServerId};
use stat_engine::memory::{InMemoryPlayerRepository, InMemoryServerRepository, StaticRconService};
use stat_engine::ranking::BasicRankingService;
use stat_engine::session::SessionStore;
use stat_engine::{
    direct_handlers, register_bus_handlers, HandlerDeps, NotificationDispatcher, PlayerRepository,
    PlayerResolver, QueueConsumer, RankingService, RconMonitor, RconService, ServerRepository,
    SessionService, UdpTransport,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// The assembled daemon.
pub struct Application {
    config: AppConfig,
}

impl Application {
    /// Loads configuration, applies CLI overrides, validates, and sets up
    /// logging.
    pub async fn new(args: CliArgs) -> anyhow::Result<Self> {
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(listen_address) = args.listen_address {
            config.daemon.listen_address = listen_address;
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        setup_logging(&config.logging, config.logging.json_format)?;

        if let Err(err) = config.validate() {
            anyhow::bail!("Configuration validation failed: {err}");
        }
        info!("✅ Configuration loaded and validated from {}", args.config_path.display());

        display_banner();
        Ok(Self { config })
    }

    /// Runs the daemon until a termination signal arrives.
    pub async fn run(self) -> anyhow::Result<()> {
        // Collaborators. The standalone build runs entirely in memory;
        // deployments with real persistence swap these through the same
        // trait objects.
        let players_impl = Arc::new(InMemoryPlayerRepository::new());
        let servers_impl = Arc::new(InMemoryServerRepository::new());
        for server in &self.config.servers {
            servers_impl.add_server(ServerId(server.id), &server.name, &server.game);
            info!("🗄️ Registered server {} ({}, {})", server.id, server.name, server.game);
        }
        let players: Arc<dyn PlayerRepository> = players_impl;
        let servers: Arc<dyn ServerRepository> = servers_impl;
        let rcon: Arc<dyn RconService> = Arc::new(StaticRconService::new());

        // The processing core.
        let bus = create_event_bus();
        let resolver = Arc::new(PlayerResolver::new(players.clone()));
        let sessions = Arc::new(SessionService::new(
            Arc::new(SessionStore::new()),
            resolver.clone(),
            rcon.clone(),
            servers.clone(),
            players.clone(),
        ));
        let notifier = Arc::new(NotificationDispatcher::new(rcon.clone(), servers.clone()));
        let ranking: Arc<dyn RankingService> = Arc::new(BasicRankingService::new(players.clone()));
        let deps = HandlerDeps {
            players: players.clone(),
            servers: servers.clone(),
            ranking,
            resolver,
            sessions: sessions.clone(),
            notifier,
        };

        register_bus_handlers(&bus, &deps).await;

        let transport = Arc::new(UdpTransport::bind(&self.config.daemon.listen_address).await?);
        let mut consumer =
            QueueConsumer::new(bus.clone(), transport, self.config.daemon.dedupe_capacity);
        for (event_type, handler) in direct_handlers(&deps) {
            consumer.register_direct(event_type, handler);
        }
        let consumer = Arc::new(consumer);

        let monitor = RconMonitor::new(
            rcon.clone(),
            servers.clone(),
            sessions.clone(),
            self.config.to_monitor_config(),
        );
        monitor.register_bus_handlers(&bus).await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let consumer_handle = tokio::spawn(Arc::clone(&consumer).run(shutdown_rx.clone()));
        let monitor_handle = tokio::spawn(Arc::clone(&monitor).run(shutdown_rx));

        info!(
            "🚀 Scorekeep daemon running: udp://{} ({} servers tracked)",
            self.config.daemon.listen_address,
            self.config.servers.len()
        );

        signals::wait_for_shutdown().await?;
        if shutdown_tx.send(true).is_err() {
            error!("Shutdown channel closed before signal delivery");
        }

        for (name, handle) in [("consumer", consumer_handle), ("monitor", monitor_handle)] {
            if tokio::time::timeout(Duration::from_secs(5), handle).await.is_err() {
                error!("{} did not drain within 5s, abandoning", name);
            }
        }

        let bus_stats = bus.get_stats().await;
        let consumer_stats = consumer.stats();
        info!(
            "📊 Shutdown summary: {} events emitted, {} handler errors, {} acked, {} dead-lettered, {} live sessions",
            bus_stats.events_emitted,
            bus_stats.handler_errors,
            consumer_stats.acked,
            consumer_stats.dead_lettered,
            sessions.store().session_count()
        );
        Ok(())
    }
}
