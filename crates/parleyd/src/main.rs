//! parleyd — Parley chat relay daemon.

use anyhow::Result;
use tokio::sync::broadcast;

use parley_core::config::ParleyConfig;
use parley_server::ChatServer;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = ParleyConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = ParleyConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        ParleyConfig::default()
    });

    tracing::info!(
        port = config.network.port,
        max_clients = config.limits.max_clients,
        shift = config.cipher.shift,
        "parleyd starting"
    );

    let server = ChatServer::bind(&config).await?;

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Run ──────────────────────────────────────────────────────────────────
    let mut shutdown_rx = shutdown_tx.subscribe();
    let acceptor = tokio::spawn(server.run(shutdown_tx));

    tokio::select! {
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        r = acceptor => match r {
            Ok(Ok(())) => tracing::info!("acceptor exited"),
            Ok(Err(e)) => return Err(e),
            Err(e) => tracing::error!(error = %e, "acceptor task panicked"),
        },
    }

    Ok(())
}
