use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};

use arc_swap::ArcSwap;
use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use worker_bridge::{
    FileConfigProvider, FileSystemAdapter, GracefulShutdown, HttpClient, HttpClientAdapter,
    HttpHandler,
    config::{ServerConfig, ServerConfigValidator, loader::load_config},
    ports::config_provider::ConfigProvider,
    tracing_setup,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Configuration file, for every subcommand
    #[clap(short, long, global = true, default_value = "config.toml")]
    config: String,
}

#[derive(Parser, Debug, PartialEq, Eq)]
enum Commands {
    /// Validate configuration file
    Validate,
    /// Initialize a new configuration file
    Init,
    /// Start the server (default)
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Validate => validate_config_command(&args.config).await,
        Commands::Init => init_config_command(&args.config).await,
        Commands::Serve => serve(&args.config).await,
    }
}

async fn serve(config_path: &str) -> Result<()> {
    let config_provider = Arc::new(
        FileConfigProvider::new(config_path).context("Failed to create config provider")?,
    );

    let initial_config = config_provider
        .load_config()
        .await
        .with_context(|| format!("Failed to load initial config from {config_path}"))?;

    tracing_setup::init_tracing(&initial_config.logging)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    ServerConfigValidator::validate(&initial_config)
        .map_err(|e| eyre!("Invalid configuration in {config_path}: {e}"))?;

    if initial_config.worker_config().is_configured() {
        tracing::info!(
            "Worker URL: {}",
            initial_config.worker_url.as_deref().unwrap_or_default()
        );
    } else {
        tracing::warn!("Worker URL is not configured; /proxy requests will be rejected");
    }

    let addr: SocketAddr = initial_config
        .listen_addr
        .parse()
        .context("Failed to parse listen address")?;

    let config_holder = Arc::new(ArcSwap::from_pointee(initial_config));
    let graceful_shutdown = GracefulShutdown::new();

    {
        let shutdown = graceful_shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = shutdown.run_signal_handler().await {
                tracing::error!("Signal handler error: {}", e);
            }
        });
    }

    spawn_config_watcher(
        config_provider,
        config_holder.clone(),
        graceful_shutdown.clone(),
    );

    let http_client: Arc<dyn HttpClient> =
        Arc::new(HttpClientAdapter::new().context("Failed to create HTTP client adapter")?);
    let file_system = Arc::new(FileSystemAdapter::new());

    let app = HttpHandler::new(config_holder, http_client, file_system).router();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    tracing::info!("Worker bridge listening on {}", addr);

    let shutdown = graceful_shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait_for_shutdown_signal().await })
        .await
        .context("Server error")?;

    tracing::info!("Graceful shutdown completed");
    Ok(())
}

/// Reload the config file on change. Invalid files are logged and ignored so the
/// running configuration stays in effect.
fn spawn_config_watcher(
    provider: Arc<FileConfigProvider>,
    config_holder: Arc<ArcSwap<ServerConfig>>,
    shutdown: GracefulShutdown,
) {
    let Some(mut notify_rx) = provider.watch() else {
        tracing::warn!("Config change notifications unavailable; hot reload disabled");
        return;
    };
    let debounce_duration = Duration::from_secs(2);

    tokio::spawn(async move {
        tracing::info!("Config watcher task started.");

        loop {
            tokio::select! {
                changed = notify_rx.recv() => {
                    if changed.is_none() {
                        break;
                    }
                }
                _ = shutdown.wait_for_shutdown_signal() => break,
            }

            // Let editors finish writing, then coalesce the burst.
            tokio::time::sleep(debounce_duration).await;
            while notify_rx.try_recv().is_ok() {}

            tracing::info!(
                "Attempting to reload configuration from {}",
                provider.path().display()
            );

            match provider.load_config().await {
                Ok(new_config) => {
                    if let Err(e) = ServerConfigValidator::validate(&new_config) {
                        tracing::error!(
                            "Reloaded configuration is invalid: {}. Keeping old configuration.",
                            e
                        );
                        continue;
                    }

                    let old = config_holder.load();
                    if old.listen_addr != new_config.listen_addr {
                        tracing::warn!(
                            "listen_addr changed to {}; a restart is required for it to apply",
                            new_config.listen_addr
                        );
                    }
                    if old.logging != new_config.logging {
                        tracing::warn!("logging settings changed; a restart is required for them to apply");
                    }

                    config_holder.store(Arc::new(new_config));
                    tracing::info!("Configuration reloaded.");
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to reload configuration: {}. Keeping old configuration.",
                        e
                    );
                }
            }
        }

        tracing::info!("Config watcher task is shutting down.");
    });
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    match ServerConfigValidator::validate(&config) {
        Ok(()) => {
            let worker = config.worker_config();
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr);
            println!(
                "   • Worker URL: {}",
                worker.worker_url().unwrap_or("(not configured)")
            );
            println!(
                "   • Timeouts: health {}s, proxy {}s",
                config.health_timeout_secs, config.proxy_timeout_secs
            );
            println!(
                "   • Admin Page: {}/{}",
                config.static_files.root.trim_end_matches('/'),
                config.static_files.index_file
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Ensure worker_url starts with http:// or https://");
            println!("   • Verify listen address format (e.g., '127.0.0.1:8080')");
            println!("   • Use timeouts greater than zero");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# Worker bridge configuration

# The address to listen on
listen_addr = "127.0.0.1:8080"

# Base URL of the Worker. Leave unset to run without one:
# /health then reports "not_configured" and /proxy answers 400.
# Can also be set with the WORKER_BRIDGE_WORKER_URL environment variable.
# worker_url = "http://127.0.0.1:8787"

# Budgets for the Worker health probe and for proxied requests
health_timeout_secs = 5
proxy_timeout_secs = 30

# Admin page served at /
[static_files]
root = "./static"
index_file = "index.html"

[logging]
level = "info"
json = true
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'worker-bridge serve --config {config_path}' to start the server");
    Ok(())
}
