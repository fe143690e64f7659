use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Instant,
};

use tokio_util::sync::CancellationToken;

use crate::{configs::Config, gateway::GatewayServices};

/// Top-level application state.
pub struct AppState {
    pub config: Config,
    pub services: GatewayServices,
    /// Control channels currently open.
    pub connections: AtomicUsize,
    /// Cancelled when the process stops; open control channels close on it.
    pub shutdown: CancellationToken,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config, services: GatewayServices) -> Self {
        Self {
            config,
            services,
            connections: AtomicUsize::new(0),
            shutdown: CancellationToken::new(),
            start_time: Instant::now(),
        }
    }

    pub fn open_connections(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }
}

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
