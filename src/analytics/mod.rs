use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::{
    common::errors::GatewayError, protocol::SongPlayedEvent, session::FinalizedInterval,
};

pub mod http;

pub use http::HttpEventPublisher;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("analytics sink responded with status {0}")]
    Status(u16),
    #[error("analytics transport error: {0}")]
    Transport(String),
}

/// Delivers `song_played` records to the analytics sink.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &SongPlayedEvent) -> Result<(), PublishError>;
}

/// Used when no analytics sink is configured.
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisher for LogEventPublisher {
    async fn publish(&self, event: &SongPlayedEvent) -> Result<(), PublishError> {
        info!(
            "song_played user={} song={} played_at={} duration={}s",
            event.user_id, event.song_id, event.played_at, event.duration_played
        );
        Ok(())
    }
}

/// Fire-and-forget hand-off of finalized intervals.
///
/// Each interval is published on its own task. Delivery is at most once:
/// failures are logged and dropped, and commands never wait for completion.
/// Only shutdown waits, through [`EventDispatcher::flush`].
#[derive(Clone)]
pub struct EventDispatcher {
    publisher: Arc<dyn EventPublisher>,
    tasks: TaskTracker,
}

impl EventDispatcher {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            publisher,
            tasks: TaskTracker::new(),
        }
    }

    pub fn dispatch(&self, interval: FinalizedInterval) {
        let publisher = self.publisher.clone();
        let event = SongPlayedEvent::from(interval);

        self.tasks.spawn(async move {
            if let Err(e) = publisher.publish(&event).await {
                let err = GatewayError::from(e);
                warn!(
                    "Dropping song_played for user={} song={}: {}",
                    event.user_id, event.song_id, err
                );
            }
        });
    }

    /// Number of publishes still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Waits up to `grace` for every dispatched publish to finish. Returns
    /// `false` if some were still running when the grace period ran out.
    pub async fn flush(&self, grace: Duration) -> bool {
        self.tasks.close();
        let finished = tokio::time::timeout(grace, self.tasks.wait()).await.is_ok();
        self.tasks.reopen();
        finished
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::common::types::{SongId, UserId};

    struct FailingPublisher(flume::Sender<()>);

    #[async_trait]
    impl EventPublisher for FailingPublisher {
        async fn publish(&self, _event: &SongPlayedEvent) -> Result<(), PublishError> {
            let _ = self.0.send(());
            Err(PublishError::Status(503))
        }
    }

    struct SlowPublisher(flume::Sender<SongPlayedEvent>);

    #[async_trait]
    impl EventPublisher for SlowPublisher {
        async fn publish(&self, event: &SongPlayedEvent) -> Result<(), PublishError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = self.0.send(event.clone());
            Ok(())
        }
    }

    fn interval(seconds: u64) -> FinalizedInterval {
        FinalizedInterval {
            user_id: UserId::from("u1"),
            song_id: SongId::from("s1"),
            started_at: OffsetDateTime::UNIX_EPOCH,
            duration_seconds: seconds,
        }
    }

    #[tokio::test]
    async fn test_dispatch_does_not_wait_for_publish() {
        let (tx, rx) = flume::unbounded();
        let dispatcher = EventDispatcher::new(Arc::new(SlowPublisher(tx)));

        let started = std::time::Instant::now();
        dispatcher.dispatch(interval(5));
        assert!(started.elapsed() < Duration::from_millis(100));

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv_async())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.duration_played, 5);
    }

    #[tokio::test]
    async fn test_publish_failure_is_swallowed() {
        let (tx, rx) = flume::unbounded();
        let dispatcher = EventDispatcher::new(Arc::new(FailingPublisher(tx)));
        dispatcher.dispatch(interval(3));

        tokio::time::timeout(Duration::from_secs(5), rx.recv_async())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_log_publisher_accepts_everything() {
        let event = SongPlayedEvent::from(interval(1));
        assert!(LogEventPublisher.publish(&event).await.is_ok());
    }

    struct HangingPublisher;

    #[async_trait]
    impl EventPublisher for HangingPublisher {
        async fn publish(&self, _event: &SongPlayedEvent) -> Result<(), PublishError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_flush_waits_for_in_flight_publishes() {
        let (tx, rx) = flume::unbounded();
        let dispatcher = EventDispatcher::new(Arc::new(SlowPublisher(tx)));
        dispatcher.dispatch(interval(4));
        dispatcher.dispatch(interval(9));
        assert_eq!(dispatcher.in_flight(), 2);

        assert!(dispatcher.flush(Duration::from_secs(5)).await);
        assert_eq!(dispatcher.in_flight(), 0);

        let mut durations: Vec<u64> = rx.try_iter().map(|e| e.duration_played).collect();
        durations.sort();
        assert_eq!(durations, vec![4, 9]);
    }

    #[tokio::test]
    async fn test_flush_gives_up_after_grace() {
        let dispatcher = EventDispatcher::new(Arc::new(HangingPublisher));
        dispatcher.dispatch(interval(2));

        assert!(!dispatcher.flush(Duration::from_millis(50)).await);
        assert_eq!(dispatcher.in_flight(), 1);
    }
}
