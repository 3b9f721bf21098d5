use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::ServerConfig;

/// Prefix of environment variables that override file settings,
/// e.g. `WORKER_BRIDGE_WORKER_URL`.
pub const ENV_PREFIX: &str = "WORKER_BRIDGE";

/// Load configuration from a file using the config crate, with environment overrides.
/// Supports multiple formats: YAML, JSON, TOML, etc. A missing file yields the defaults.
pub async fn load_config(config_path: &str) -> Result<ServerConfig> {
    load_config_sync(config_path)
}

/// Load configuration synchronously
pub fn load_config_sync(config_path: &str) -> Result<ServerConfig> {
    build_config(
        config_path,
        Some(Environment::with_prefix(ENV_PREFIX).try_parsing(true)),
    )
}

/// Load configuration from the file only, ignoring the environment
pub fn load_file_only(config_path: &str) -> Result<ServerConfig> {
    build_config(config_path, None)
}

fn build_config(config_path: &str, env: Option<Environment>) -> Result<ServerConfig> {
    let config_path = Path::new(config_path);

    // Determine file format based on extension
    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Yaml, // Default to YAML
    };

    let mut builder = Config::builder().add_source(
        File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            format,
        )
        .required(false),
    );
    if let Some(env) = env {
        builder = builder.add_source(env);
    }

    let settings = builder
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let server_config: ServerConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    Ok(server_config)
}
