//! Configuration loading and management

use crate::core::error::SyncResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client configuration for the invoice-sync engine
///
/// All fields have defaults matching the reference deployment; a YAML file
/// only needs to name the fields it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the remote invoice store
    pub base_url: String,

    /// Maximum accepted file size in bytes
    pub max_file_size: u64,

    /// Accepted file extensions, lowercase, without the dot
    pub allowed_extensions: Vec<String>,

    /// Buffer size for the cache event broadcast channel
    pub event_capacity: usize,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            max_file_size: 10 * 1024 * 1024,
            allowed_extensions: vec!["pdf".to_string()],
            event_capacity: 1024,
            request_timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> SyncResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> SyncResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
