use async_trait::async_trait;

use crate::common::types::SongId;

pub mod graphql;
pub mod locator;

pub use graphql::GraphqlCatalog;
pub use locator::AudioLocator;

/// Song metadata as the catalog returns it. `audio_locator` is either a
/// full URL or a storage key, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSong {
    pub id: String,
    pub title: String,
    pub audio_locator: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("song {0} not found")]
    NotFound(SongId),
    #[error("catalog request timed out")]
    Timeout,
    #[error("catalog responded with status {0}")]
    Status(u16),
    #[error("catalog transport error: {0}")]
    Transport(String),
    #[error("catalog response could not be decoded: {0}")]
    Decode(String),
}

/// Looks up song metadata by id.
#[async_trait]
pub trait CatalogResolver: Send + Sync {
    async fn resolve(&self, song_id: &SongId) -> Result<CatalogSong, CatalogError>;
}
