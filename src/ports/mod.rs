pub mod config_provider;
pub mod file_system;
pub mod http_client;
pub mod http_server;
