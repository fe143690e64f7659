use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    analytics::{EventPublisher, PublishError},
    common::HttpClient,
    protocol::SongPlayedEvent,
};

/// Posts each event as JSON to the analytics sink. No retries.
pub struct HttpEventPublisher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpEventPublisher {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(HttpClient::new(timeout)?, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl EventPublisher for HttpEventPublisher {
    async fn publish(&self, event: &SongPlayedEvent) -> Result<(), PublishError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(event)
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PublishError::Status(status.as_u16()));
        }

        debug!(
            "Published song_played user={} song={} duration={}s",
            event.user_id, event.song_id, event.duration_played
        );
        Ok(())
    }
}
