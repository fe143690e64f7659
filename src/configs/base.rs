use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{common::types::AnyResult, configs::*};

const CONFIG_CANDIDATES: [&str; 2] = ["config.toml", "config.default.toml"];

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Loads the first config file found, then applies environment
    /// overrides. Returns the path that was read, if any.
    pub fn load() -> AnyResult<(Self, Option<&'static str>)> {
        let found = CONFIG_CANDIDATES
            .into_iter()
            .find(|candidate| Path::new(candidate).exists());

        let mut config = match found {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?)
                .map_err(|e| format!("{}: {}", path, e))?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok((config, found))
    }

    pub fn from_toml(source: &str) -> AnyResult<Self> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(toml::from_str(source)?)
    }

    /// Overrides file settings with the deployment environment. `lookup`
    /// is `std::env::var` in production.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = var("PORT").and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
        }
        if let Some(url) = var("API_GATEWAY_URL") {
            self.catalog.base_url = url;
        }
        if let Some(key) = var("S3_ACCESS_KEY") {
            self.storage.access_key = Some(key);
        }
        if let Some(secret) = var("S3_SECRET_KEY") {
            self.storage.secret_key = Some(secret);
        }
        if let Some(token) = var("S3_SESSION_TOKEN") {
            self.storage.session_token = Some(token);
        }
        if let Some(bucket) = var("S3_BUCKET_NAME") {
            self.storage.bucket = Some(bucket);
        }
        if let Some(region) = var("AWS_REGION") {
            self.storage.region = region;
        }
        if let Some(endpoint) = var("S3_ENDPOINT") {
            self.storage.endpoint = Some(endpoint);
        }
        if let Some(endpoint) = var("ANALYTICS_URL") {
            self.analytics.endpoint = Some(endpoint);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults_match_deployment() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.catalog.graphql_url(),
            "http://apigateway:8080/api/v1/music/graphql"
        );
        assert_eq!(config.storage.region, "us-east-2");
        assert_eq!(config.storage.url_expiry_secs, 3600);
        assert!(!config.storage.is_complete());
        assert!(config.analytics.endpoint.is_none());
        assert!(config.session.max_idle_secs.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 9000

            [storage]
            access_key = "AK"
            secret_key = "SK"
            bucket = "songs"

            [session]
            max_idle_secs = 900
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.storage.is_complete());
        assert_eq!(config.storage.region, "us-east-2");
        assert_eq!(config.session.max_idle_secs, Some(900));
        assert_eq!(config.session.sweep_interval_secs, 60);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = Config::from_toml("  \n").unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(Config::from_toml("[server\nport = ").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PORT", "3000"),
            ("API_GATEWAY_URL", "http://gateway.local"),
            ("S3_ACCESS_KEY", "AK"),
            ("S3_SECRET_KEY", "SK"),
            ("S3_SESSION_TOKEN", "TOKEN"),
            ("S3_BUCKET_NAME", "audio"),
            ("AWS_REGION", "eu-west-1"),
            ("ANALYTICS_URL", "http://analytics.local/events"),
        ]);

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 3000);
        assert_eq!(
            config.catalog.graphql_url(),
            "http://gateway.local/api/v1/music/graphql"
        );
        assert!(config.storage.is_complete());
        assert_eq!(config.storage.session_token.as_deref(), Some("TOKEN"));
        assert_eq!(config.storage.region, "eu-west-1");
        assert_eq!(
            config.analytics.endpoint.as_deref(),
            Some("http://analytics.local/events")
        );
    }

    #[test]
    fn test_blank_or_bad_env_values_ignored() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "PORT" => Some("not-a-port".into()),
            "S3_BUCKET_NAME" => Some("   ".into()),
            _ => None,
        });
        assert_eq!(config.server.port, 8080);
        assert!(config.storage.bucket.is_none());
    }
}
