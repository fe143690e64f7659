use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{
    catalog::{CatalogError, CatalogResolver, CatalogSong},
    common::{HttpClient, types::SongId},
    configs::CatalogConfig,
};

const SONG_BY_ID_QUERY: &str = "query GetSongById($id: ID!) { song(id: $id) { id title audio_url } }";

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<SongData>,
    #[serde(default)]
    errors: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SongData {
    song: Option<SongDto>,
}

#[derive(Debug, Deserialize)]
struct SongDto {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    audio_url: Option<String>,
}

/// Resolves songs through the music catalog's GraphQL API.
pub struct GraphqlCatalog {
    client: reqwest::Client,
    endpoint: String,
}

impl GraphqlCatalog {
    pub fn new(config: &CatalogConfig) -> Result<Self, reqwest::Error> {
        let client = HttpClient::new(Duration::from_millis(config.timeout_ms))?;
        Ok(Self::with_client(client, config.graphql_url()))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CatalogResolver for GraphqlCatalog {
    async fn resolve(&self, song_id: &SongId) -> Result<CatalogSong, CatalogError> {
        debug!("Querying catalog at {} for song {}", self.endpoint, song_id);

        let body = json!({
            "query": SONG_BY_ID_QUERY,
            "variables": { "id": song_id },
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CatalogError::Timeout
                } else {
                    CatalogError::Transport(e.to_string())
                }
            })?;

        match resp.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(CatalogError::NotFound(song_id.clone())),
            status => {
                warn!("Catalog responded with {} for song {}", status, song_id);
                return Err(CatalogError::Status(status.as_u16()));
            }
        }

        let payload: GraphqlResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                CatalogError::Timeout
            } else {
                CatalogError::Decode(e.to_string())
            }
        })?;

        if !payload.errors.is_empty() {
            debug!(
                "Catalog returned {} GraphQL error(s) for song {}",
                payload.errors.len(),
                song_id
            );
            return Err(CatalogError::NotFound(song_id.clone()));
        }

        let song = payload
            .data
            .and_then(|d| d.song)
            .ok_or_else(|| CatalogError::NotFound(song_id.clone()))?;

        Ok(CatalogSong {
            id: song.id,
            title: song.title.unwrap_or_default(),
            audio_locator: song.audio_url.unwrap_or_default(),
        })
    }
}
