use clap::Parser;
use tokio::{net::TcpListener, signal};

use lockstep_server::{
    config::Config, handler::AppState, logger::setup_logger, registry::Registry, router,
    session::SessionManager,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    setup_logger(&config.log_level);

    let addr = config.bind_addr()?;
    let app_state = AppState {
        sessions: SessionManager::new(Registry::new(), config.grace_period()),
        error_close_delay: config.error_close_delay(),
    };

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Lockstep server listening on {}", listener.local_addr()?);
    tracing::info!("Connect to: ws://{}/ws?room=<room>&username=<name>", addr);

    axum::serve(listener, router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
