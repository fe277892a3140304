use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};

use game_persistence::open_store;
use game_server::{config::Config, create_routes, session::SessionManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting number guess server...");

    let config = Config::new().context("invalid configuration")?;
    if config.uses_default_secret() {
        warn!("SECRET_KEY is not set, session cookies are signed with the development key");
    }

    let score_store = open_store(&config.store_settings())
        .await
        .with_context(|| format!("failed to open the {} leaderboard", config.backend))?;
    info!("Leaderboard backend: {}", score_store.backend());

    let session_manager = Arc::new(SessionManager::new(
        &config.secret_key,
        config.session_timeout(),
    ));

    let routes = create_routes(
        session_manager.clone(),
        score_store,
        config.leaderboard_size,
    );

    // Start cleanup task
    let cleanup_session_manager = session_manager.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_session_manager.cleanup_expired_sessions().await;
        }
    });

    info!("Server starting on {}:{}", config.host, config.port);

    let bind_addr = (config.host, config.port);
    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(bind_addr, async {
            // Wait for SIGINT (Ctrl+C) or SIGTERM
            #[cfg(unix)]
            {
                let mut sigint = match signal::unix::signal(signal::unix::SignalKind::interrupt()) {
                    Ok(sigint) => sigint,
                    Err(e) => {
                        warn!("Cannot listen for SIGINT: {}", e);
                        return std::future::pending().await;
                    }
                };
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Cannot listen for SIGTERM: {}", e);
                        return std::future::pending().await;
                    }
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
                    warn!("Cannot listen for Ctrl+C: {}", e);
                    return std::future::pending().await;
                }
                info!("Received Ctrl+C, shutting down gracefully...");
            }
        })
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
    Ok(())
}
