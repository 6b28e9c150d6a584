//! Backend connection settings.
//!
//! # Responsibility
//! - Hold the endpoint/project/database/collection identifiers.
//! - Apply environment overrides once at startup.
//!
//! # Invariants
//! - Every setting has a built-in default; blank overrides are ignored.
//! - `endpoint` is an absolute http(s) URL without a trailing slash.

use crate::backend::CollectionRef;
use reqwest::Url;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://cloud.appwrite.io/v1";
pub const DEFAULT_PROJECT_ID: &str = "69158ea300037a4708e1";
pub const DEFAULT_DATABASE_ID: &str = "69158ec0000624c38e92";
pub const DEFAULT_COLLECTION_ID: &str = "notes";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_ENDPOINT: &str = "APPWRITE_ENDPOINT";
pub const ENV_PROJECT_ID: &str = "APPWRITE_PROJECT_ID";
pub const ENV_DATABASE_ID: &str = "APPWRITE_DATABASE_ID";
pub const ENV_COLLECTION_ID: &str = "APPWRITE_COLLECTION_ID";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "NOTESAPP_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidEndpoint(String),
    InvalidTimeout(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEndpoint(value) => {
                write!(f, "endpoint must be an absolute http(s) URL, got `{value}`")
            }
            Self::InvalidTimeout(value) => {
                write!(f, "request timeout must be a positive number of seconds, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Effective backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub collection_id: String,
    pub request_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            project_id: DEFAULT_PROJECT_ID.to_string(),
            database_id: DEFAULT_DATABASE_ID.to_string(),
            collection_id: DEFAULT_COLLECTION_ID.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl BackendConfig {
    /// Builds the config from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    ///
    /// # Errors
    /// - Returns an error when the endpoint is not an absolute http(s) URL.
    /// - Returns an error when the timeout is not a positive integer.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(endpoint) = read(ENV_ENDPOINT) {
            config.endpoint = endpoint;
        }
        if let Some(project_id) = read(ENV_PROJECT_ID) {
            config.project_id = project_id;
        }
        if let Some(database_id) = read(ENV_DATABASE_ID) {
            config.database_id = database_id;
        }
        if let Some(collection_id) = read(ENV_COLLECTION_ID) {
            config.collection_id = collection_id;
        }
        if let Some(raw) = read(ENV_REQUEST_TIMEOUT_SECS) {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout(raw))?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.endpoint = normalize_endpoint(&config.endpoint)?;
        Ok(config)
    }

    /// Notes collection addressed by this config.
    pub fn notes_collection(&self) -> CollectionRef {
        CollectionRef::new(self.database_id.clone(), self.collection_id.clone())
    }
}

fn normalize_endpoint(raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw).map_err(|_| ConfigError::InvalidEndpoint(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidEndpoint(raw.to_string()));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::{BackendConfig, ConfigError, DEFAULT_ENDPOINT, ENV_COLLECTION_ID, ENV_ENDPOINT};
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let config = BackendConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, BackendConfig::default());
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.notes_collection().collection_id, "notes");
    }

    #[test]
    fn overrides_replace_defaults_and_blank_values_are_ignored() {
        let config = BackendConfig::from_lookup(lookup(&[
            (ENV_ENDPOINT, "http://localhost/v1/"),
            (ENV_COLLECTION_ID, "  "),
            ("NOTESAPP_REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.endpoint, "http://localhost/v1");
        assert_eq!(config.collection_id, "notes");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_non_http_endpoint_and_zero_timeout() {
        let err = BackendConfig::from_lookup(lookup(&[(ENV_ENDPOINT, "ftp://host")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint(_)));

        let err = BackendConfig::from_lookup(lookup(&[("NOTESAPP_REQUEST_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeout("0".to_string()));
    }
}
