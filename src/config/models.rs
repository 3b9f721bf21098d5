//! Configuration data structures for the Worker bridge.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files and
//! `WORKER_BRIDGE_*` environment variables. Every field has a default so an
//! empty file, or no file at all, is a valid starting point.
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::worker::{DEFAULT_HEALTH_TIMEOUT, DEFAULT_PROXY_TIMEOUT, WorkerConfig};

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_health_timeout_secs() -> u64 {
    DEFAULT_HEALTH_TIMEOUT.as_secs()
}

fn default_proxy_timeout_secs() -> u64 {
    DEFAULT_PROXY_TIMEOUT.as_secs()
}

/// Where the admin page is read from
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Root directory for static files
    pub root: String,
    /// File served at `/`
    pub index_file: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: "./static".to_string(),
            index_file: "index.html".to_string(),
        }
    }
}

/// Log output settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub level: String,
    /// JSON lines when true, human-readable output otherwise
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Base URL of the Worker; unset or blank means "not configured"
    #[serde(default)]
    pub worker_url: Option<String>,
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,
    #[serde(default = "default_proxy_timeout_secs")]
    pub proxy_timeout_secs: u64,
    #[serde(default)]
    pub static_files: StaticFilesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Create a new server configuration builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Read-only Worker view handed to request handlers.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig::new(self.worker_url.clone())
            .with_health_timeout(Duration::from_secs(self.health_timeout_secs))
            .with_proxy_timeout(Duration::from_secs(self.proxy_timeout_secs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            worker_url: None,
            health_timeout_secs: default_health_timeout_secs(),
            proxy_timeout_secs: default_proxy_timeout_secs(),
            static_files: StaticFilesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Builder for ServerConfig to allow for cleaner configuration creation
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the Worker base URL
    pub fn worker_url(mut self, url: impl Into<String>) -> Self {
        self.config.worker_url = Some(url.into());
        self
    }

    pub fn health_timeout_secs(mut self, secs: u64) -> Self {
        self.config.health_timeout_secs = secs;
        self
    }

    pub fn proxy_timeout_secs(mut self, secs: u64) -> Self {
        self.config.proxy_timeout_secs = secs;
        self
    }

    /// Set the directory the admin page is read from
    pub fn static_root(mut self, root: impl Into<String>) -> Self {
        self.config.static_files.root = root.into();
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}
