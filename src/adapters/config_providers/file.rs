use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eyre::{Context, Result};
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::{
    config::{loader::load_config, models::ServerConfig},
    ports::config_provider::ConfigProvider,
};

/// Configuration provider that loads from a local file and watches it for changes.
///
/// The parent directory is watched rather than the file itself so editors that
/// replace the file on save are still noticed.
pub struct FileConfigProvider {
    path: PathBuf,
    // Dropping the watcher stops notifications.
    _watcher: Option<notify::RecommendedWatcher>,
    update_rx: std::sync::Mutex<Option<mpsc::Receiver<()>>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (tx, rx) = mpsc::channel(1);

        let watcher = Self::init_watcher(&path, tx)?;

        Ok(Self {
            path,
            _watcher: watcher,
            update_rx: std::sync::Mutex::new(Some(rx)),
        })
    }

    /// Start a watcher on the config file's directory, or `None` if the directory is absent.
    fn init_watcher(
        path: &Path,
        tx: mpsc::Sender<()>,
    ) -> Result<Option<notify::RecommendedWatcher>> {
        let config_filename = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("Invalid config path: {}", path.display()))?
            .to_owned();

        let watch_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !watch_dir.is_dir() {
            tracing::warn!(
                "Config directory {} does not exist; hot reload disabled",
                watch_dir.display()
            );
            return Ok(None);
        }

        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        if (event.kind.is_modify()
                            || event.kind.is_create()
                            || event.kind.is_remove())
                            && event
                                .paths
                                .iter()
                                .any(|p| p.file_name() == Some(config_filename.as_os_str()))
                        {
                            tracing::debug!("Config file changed: {:?}", event.kind);
                            // A pending signal already covers this change.
                            let _ = tx.try_send(());
                        }
                    }
                    Err(e) => tracing::error!("File watch error: {:?}", e),
                }
            })?;

        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .wrap_err("Failed to watch config directory")?;

        Ok(Some(watcher))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn load_config(&self) -> Result<ServerConfig> {
        let path_str = self
            .path
            .to_str()
            .ok_or_else(|| eyre::eyre!("Invalid path: {}", self.path.display()))?;
        load_config(path_str).await
    }

    fn watch(&self) -> Option<mpsc::Receiver<()>> {
        match self.update_rx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}
