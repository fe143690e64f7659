use std::{sync::Arc, time::Duration};

use tokio::time::timeout;
use tracing::debug;

use crate::{
    catalog::{AudioLocator, CatalogError, CatalogResolver},
    common::{errors::GatewayError, types::SongId},
    protocol::SongPayload,
    signer::{LocationSigner, SigningError},
};

/// Turns a song id into something a client can play: catalog lookup, then
/// signing when the catalog only has a storage key.
pub struct SongResolver {
    catalog: Arc<dyn CatalogResolver>,
    signer: Option<Arc<dyn LocationSigner>>,
    request_timeout: Duration,
}

impl SongResolver {
    pub fn new(
        catalog: Arc<dyn CatalogResolver>,
        signer: Option<Arc<dyn LocationSigner>>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            signer,
            request_timeout,
        }
    }

    pub fn can_sign(&self) -> bool {
        self.signer.is_some()
    }

    pub async fn resolve(&self, song_id: &SongId) -> Result<SongPayload, GatewayError> {
        let song = timeout(self.request_timeout, self.catalog.resolve(song_id))
            .await
            .map_err(|_| CatalogError::Timeout)??;

        let locator = AudioLocator::classify(&song.audio_locator).ok_or_else(|| {
            GatewayError::NoAudioAvailable {
                title: song.title.clone(),
            }
        })?;

        let audio_url = match locator {
            AudioLocator::Url(url) => url,
            AudioLocator::StorageKey(key) => {
                let signer = self.signer.as_ref().ok_or(SigningError::Unavailable)?;
                debug!("Signing storage key for song {}", song_id);
                timeout(self.request_timeout, signer.sign(&key))
                    .await
                    .map_err(|_| SigningError::Failed("timed out".into()))??
            }
        };

        Ok(SongPayload {
            id: song.id,
            title: song.title,
            audio_url,
        })
    }
}
