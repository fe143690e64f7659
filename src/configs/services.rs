use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CatalogConfig {
    /// API gateway in front of the music catalog.
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,
    #[serde(default = "default_graphql_path")]
    pub graphql_path: String,
    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,
}

impl CatalogConfig {
    pub fn graphql_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.graphql_path.trim_start_matches('/')
        )
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            graphql_path: default_graphql_path(),
            timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Object storage credentials used to pre-sign audio keys.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Set when the keys are temporary STS credentials.
    pub session_token: Option<String>,
    pub bucket: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    /// S3-compatible service URL (e.g. MinIO). Buckets are then addressed by
    /// path; unset means the regional AWS endpoint.
    pub endpoint: Option<String>,
    #[serde(default = "default_url_expiry_secs")]
    pub url_expiry_secs: u64,
}

impl StorageConfig {
    /// Signing needs all three of access key, secret key and bucket.
    pub fn is_complete(&self) -> bool {
        [&self.access_key, &self.secret_key, &self.bucket]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            access_key: None,
            secret_key: None,
            session_token: None,
            bucket: None,
            region: default_region(),
            endpoint: None,
            url_expiry_secs: default_url_expiry_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnalyticsConfig {
    /// Sink receiving `song_played` records. Unset means events are only logged.
    pub endpoint: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_catalog_base_url() -> String {
    "http://apigateway:8080".to_string()
}

fn default_graphql_path() -> String {
    "/api/v1/music/graphql".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_region() -> String {
    "us-east-2".to_string()
}

fn default_url_expiry_secs() -> u64 {
    3600
}
