//! Storage configuration loaded from TOML.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::log::{LogSink, Logger, StdoutSink, TracingSink};

/// Where log events go when no sink is supplied in code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Print to stdout
    #[default]
    Stdout,
    /// Forward to `tracing`
    Tracing,
}

/// Top-level storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Label attached to every log event
    #[serde(default)]
    pub log_label: Option<String>,

    /// Log destination
    #[serde(default)]
    pub log_target: LogTarget,

    /// Maximum keys requested per object listing page
    #[serde(default = "default_list_page_size")]
    pub list_page_size: usize,

    /// Object store connection; object paths are unavailable without it
    #[serde(default)]
    pub object_store: Option<ObjectStoreConfig>,
}

/// S3-compatible connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// Custom endpoint (MinIO, Ceph, ...); AWS when unset
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Region name
    #[serde(default = "default_region")]
    pub region: String,

    /// Access key id
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Secret access key
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Session token for temporary credentials
    #[serde(default)]
    pub session_token: Option<String>,

    /// Allow plain HTTP endpoints
    #[serde(default)]
    pub allow_http: bool,
}

fn default_list_page_size() -> usize {
    1000
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            log_label: None,
            log_target: LogTarget::default(),
            list_page_size: default_list_page_size(),
            object_store: None,
        }
    }
}

impl StorageConfig {
    /// Load config from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StorageConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Build the logger described by this config.
    pub fn logger(&self) -> Logger {
        let sink: Arc<dyn LogSink> = match self.log_target {
            LogTarget::Stdout => Arc::new(StdoutSink),
            LogTarget::Tracing => Arc::new(TracingSink),
        };
        let logger = Logger::new(sink);
        match &self.log_label {
            Some(label) => logger.with_label(label.clone()),
            None => logger,
        }
    }
}
