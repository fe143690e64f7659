use std::{sync::Arc, time::Duration};

use stream_gateway::{
    common::{logger, types::AnyResult},
    configs::Config,
    server::{AppState, build_services, drain_sessions},
    session::spawn_idle_sweeper,
    transport,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> AnyResult<()> {
    let (config, source) = Config::load()?;
    logger::init(config.logging.as_ref());

    match source {
        Some(path) => info!("Loaded configuration from {}", path),
        None => warn!("No config file found, using defaults"),
    }

    let services = build_services(&config).await?;

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    let address = listener.local_addr()?;

    let grace = Duration::from_secs(config.server.shutdown_grace_secs);
    let sweep = config
        .session
        .max_idle_secs
        .map(|max_idle| (max_idle, config.session.sweep_interval_secs));

    let state = Arc::new(AppState::new(config, services));
    let shutdown = state.shutdown.clone();

    let sweeper = sweep.map(|(max_idle, every)| {
        info!("Idle sweeper finalizes paused sessions after {}s", max_idle);
        spawn_idle_sweeper(
            state.services.registry.clone(),
            state.services.dispatcher.clone(),
            Duration::from_secs(max_idle),
            Duration::from_secs(every),
            shutdown.clone(),
        )
    });

    let app = transport::router(state.clone());
    info!(
        "Stream gateway v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        address
    );

    let signal_token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signal_token.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(handle) = sweeper {
        let _ = handle.await;
    }

    drain_sessions(&state, grace).await;
    info!("Stream gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
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

    info!("Shutdown signal received");
}
