use std::time::Duration;

use tokio::time::{Instant, sleep, timeout_at};
use tracing::{info, warn};

use crate::server::AppState;

/// Closes every control channel and publishes whatever is still open.
///
/// Channels get `grace` to run their own disconnect. Sessions left after
/// that are finalized here, then the remaining grace goes to in-flight
/// publishes. Returns how many intervals this sweep had to finalize itself.
pub async fn drain_sessions(state: &AppState, grace: Duration) -> usize {
    let deadline = Instant::now() + grace;
    state.shutdown.cancel();

    let closed = timeout_at(deadline, async {
        while state.open_connections() > 0 {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    if closed.is_err() {
        warn!(
            "{} control channel(s) still open at shutdown",
            state.open_connections()
        );
    }

    let services = &state.services;
    let stranded = services.registry.finalize_all();
    let count = stranded.len();
    for interval in stranded {
        services.dispatcher.dispatch(interval);
    }

    let remaining = deadline.saturating_duration_since(Instant::now());
    if services.dispatcher.flush(remaining).await {
        info!("Shutdown drain finalized {} session(s)", count);
    } else {
        warn!(
            "Shutdown drain gave up on {} song_played publish(es)",
            services.dispatcher.in_flight()
        );
    }
    count
}
