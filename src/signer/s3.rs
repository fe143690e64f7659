use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::{Credentials, Region},
    error::DisplayErrorContext,
    presigning::PresigningConfig,
};
use reqwest::Url;
use tracing::debug;

use crate::{
    configs::StorageConfig,
    signer::{LocationSigner, SigningError},
};

/// Longest validity S3 accepts for a pre-signed URL (7 days).
const MAX_EXPIRY_SECS: u64 = 604_800;

/// Pre-signs S3 `GET` URLs with the AWS SDK presigner. Signing is local, no
/// request reaches the bucket.
pub struct S3Presigner {
    client: Client,
    bucket: String,
    expires: Duration,
}

impl S3Presigner {
    /// Fails with [`SigningError::Unavailable`] unless access key, secret key
    /// and bucket are all configured.
    pub async fn new(config: &StorageConfig) -> Result<Self, SigningError> {
        let (Some(access_key), Some(secret_key), Some(bucket)) = (
            config.access_key.as_deref().filter(|s| !s.is_empty()),
            config.secret_key.as_deref().filter(|s| !s.is_empty()),
            config.bucket.as_deref().filter(|s| !s.is_empty()),
        ) else {
            return Err(SigningError::Unavailable);
        };

        let endpoint = match config.endpoint.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => {
                let url = Url::parse(raw)
                    .map_err(|e| SigningError::InvalidEndpoint(format!("{}: {}", raw, e)))?;
                if url.host_str().is_none() {
                    return Err(SigningError::InvalidEndpoint(raw.to_string()));
                }
                Some(raw.trim_end_matches('/').to_string())
            }
            None => None,
        };

        let credentials = Credentials::new(
            access_key,
            secret_key,
            config.session_token.clone().filter(|s| !s.is_empty()),
            None,
            "stream-gateway",
        );

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        // Custom endpoints (MinIO and friends) address buckets by path.
        let mut s3_config = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = endpoint {
            s3_config = s3_config.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(s3_config.build()),
            bucket: bucket.to_string(),
            expires: Duration::from_secs(config.url_expiry_secs.clamp(1, MAX_EXPIRY_SECS)),
        })
    }

    /// Signs `key` as if the request were made at `now`.
    pub async fn presign_at(&self, key: &str, now: SystemTime) -> Result<String, SigningError> {
        let key = key.trim().trim_start_matches('/');
        if key.is_empty() {
            return Err(SigningError::EmptyKey);
        }

        let presigning = PresigningConfig::builder()
            .start_time(now)
            .expires_in(self.expires)
            .build()
            .map_err(|e| SigningError::Failed(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| SigningError::Failed(DisplayErrorContext(&e).to_string()))?;

        Ok(request.uri().to_string())
    }
}

#[async_trait]
impl LocationSigner for S3Presigner {
    async fn sign(&self, key: &str) -> Result<String, SigningError> {
        let url = self.presign_at(key, SystemTime::now()).await?;
        debug!("Signed storage key '{}' for {}s", key, self.expires.as_secs());
        Ok(url)
    }
}
