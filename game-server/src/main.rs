use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use game_persistence::{SeaOrmStore, SnapshotStatsSource, connect_and_migrate};
use game_server::{
    ai::HeuristicAi, auth::AuthService, build_game_manager, config::Config, create_routes,
    websocket::ConnectionManager,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    info!("Starting Grid Arena server...");

    let config = Config::new();

    let db = match connect_and_migrate(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database and run migrations: {}", e);
            std::process::exit(1);
        }
    };

    let snapshot = SnapshotStatsSource::load_or_empty(&config.stats_snapshot_path);
    let connection_manager = Arc::new(ConnectionManager::new());
    let game_manager = build_game_manager(
        Arc::new(SeaOrmStore::new(db)),
        Arc::new(snapshot),
        connection_manager.clone(),
        Arc::new(HeuristicAi::new()),
        config.manager_timeouts(),
    );

    let auth_service = if config.auth_dev_mode {
        info!("Starting in development authentication mode - JWT validation disabled");
        Arc::new(AuthService::new_dev_mode())
    } else {
        match &config.jwt_secret {
            Some(secret) => Arc::new(AuthService::new(secret)),
            None => {
                warn!("JWT_SECRET is not set; every sign-in will be refused");
                Arc::new(AuthService::new(""))
            }
        }
    };

    let routes = create_routes(
        connection_manager.clone(),
        game_manager.clone(),
        auth_service,
        config.rate_limit(),
    );

    // Housekeeping: idle connections, stale tickets, idle games, and
    // writes that could not be stored earlier.
    let cleanup_config = config.clone();
    let cleanup_connection_manager = connection_manager.clone();
    let cleanup_game_manager = game_manager.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_config.retry_interval());
        loop {
            interval.tick().await;

            for user_id in cleanup_connection_manager
                .cleanup_inactive_connections(cleanup_config.connection_timeout())
                .await
            {
                cleanup_game_manager.handle_disconnect(user_id).await;
            }
            cleanup_game_manager
                .expire_queue_tickets(cleanup_config.queue_timeout())
                .await;
            cleanup_game_manager
                .cleanup_inactive_games(cleanup_config.game_timeout())
                .await;

            let pending = cleanup_game_manager.retry_pending().await;
            if pending > 0 {
                warn!("{} writes still waiting for the database", pending);
            }
        }
    });

    info!("Server starting on {}:{}", config.host, config.port);

    let ip = match config.host.parse::<std::net::IpAddr>() {
        Ok(ip) => ip,
        Err(e) => {
            error!("Invalid HOST '{}': {}", config.host, e);
            std::process::exit(1);
        }
    };

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown((ip, config.port), async {
        #[cfg(unix)]
        {
            let (Ok(mut sigint), Ok(mut sigterm)) = (
                signal::unix::signal(signal::unix::SignalKind::interrupt()),
                signal::unix::signal(signal::unix::SignalKind::terminate()),
            ) else {
                error!("Failed to install signal handlers");
                std::future::pending::<()>().await;
                return;
            };

            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for ctrl+c: {}", e);
                std::future::pending::<()>().await;
                return;
            }
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    });

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}
