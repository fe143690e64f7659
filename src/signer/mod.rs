use async_trait::async_trait;

pub mod s3;

pub use s3::S3Presigner;

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("empty storage key")]
    EmptyKey,
    #[error("storage signing is not configured")]
    Unavailable,
    #[error("invalid storage endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("signing failed: {0}")]
    Failed(String),
}

/// Turns an opaque storage key into a time-limited playable URL.
#[async_trait]
pub trait LocationSigner: Send + Sync {
    async fn sign(&self, key: &str) -> Result<String, SigningError>;
}
