pub mod config_providers;
pub mod file_system;
pub mod http_client;
pub mod http_handler;

/// Re-export commonly used types from adapters
pub use config_providers::FileConfigProvider;
pub use file_system::FileSystemAdapter;
pub use http_client::HttpClientAdapter;
pub use http_handler::HttpHandler;
