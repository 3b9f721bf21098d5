use async_trait::async_trait;
use eyre::Result;
use tokio::sync::mpsc;

use crate::config::models::ServerConfig;

/// Source of the server configuration, including the Worker URL.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Load a fresh copy of the configuration.
    async fn load_config(&self) -> Result<ServerConfig>;

    /// Change notifications. Each message means "call `load_config` again".
    ///
    /// The receiver can be taken once; later calls return `None`.
    fn watch(&self) -> Option<mpsc::Receiver<()>>;
}
