use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{analytics::EventDispatcher, session::SessionRegistry};

/// Periodically finalizes paused sessions nobody came back to.
pub fn spawn_idle_sweeper(
    registry: Arc<SessionRegistry>,
    dispatcher: EventDispatcher,
    max_idle: Duration,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(Duration::from_secs(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let swept = registry.finalize_idle(max_idle);
                    if !swept.is_empty() {
                        info!("Idle sweep finalized {} paused session(s)", swept.len());
                    }
                    for finalized in swept {
                        dispatcher.dispatch(finalized);
                    }
                }
            }
        }
    })
}
