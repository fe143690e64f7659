use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use crate::{
    analytics::{EventDispatcher, EventPublisher, HttpEventPublisher, LogEventPublisher},
    catalog::GraphqlCatalog,
    common::types::AnyResult,
    configs::Config,
    gateway::{GatewayServices, SongResolver},
    session::SessionRegistry,
    signer::{LocationSigner, S3Presigner},
};

/// Wires the external collaborators described by `config` into the shared
/// services every connection uses.
pub async fn build_services(config: &Config) -> AnyResult<GatewayServices> {
    let catalog = GraphqlCatalog::new(&config.catalog)?;
    info!("Catalog endpoint: {}", catalog.endpoint());

    let signer: Option<Arc<dyn LocationSigner>> = match S3Presigner::new(&config.storage).await {
        Ok(presigner) => {
            info!("Storage signing enabled for region {}", config.storage.region);
            Some(Arc::new(presigner))
        }
        Err(e) => {
            warn!("Storage signing disabled: {}", e);
            None
        }
    };

    let publisher: Arc<dyn EventPublisher> = match config.analytics.endpoint.as_deref() {
        Some(endpoint) if !endpoint.trim().is_empty() => {
            info!("Publishing song_played events to {}", endpoint);
            Arc::new(HttpEventPublisher::new(
                endpoint,
                Duration::from_millis(config.analytics.timeout_ms),
            )?)
        }
        _ => {
            warn!("No analytics endpoint configured, song_played events are only logged");
            Arc::new(LogEventPublisher)
        }
    };

    let songs = SongResolver::new(
        Arc::new(catalog),
        signer,
        Duration::from_millis(config.catalog.timeout_ms),
    );

    Ok(GatewayServices {
        registry: Arc::new(SessionRegistry::new()),
        songs: Arc::new(songs),
        dispatcher: EventDispatcher::new(publisher),
    })
}
