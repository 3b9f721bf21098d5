//! Worker bridge - admin front-end and reverse proxy for a single Worker service.
//!
//! The bridge serves a static admin page, reports its own health together with
//! the health of a downstream **Worker**, and relays browser calls under
//! `/proxy/...` to that Worker so the admin page never makes cross-origin
//! requests.
//!
//! # Endpoints
//! - `GET /` - the admin page (`text/html`), 404 if missing, 500 if unreadable
//! - `GET /health` - JSON [`HealthReport`](core::HealthReport)
//! - `GET|POST|PUT|DELETE|OPTIONS /proxy/{path}` - relayed to `{worker_url}/{path}`
//!
//! # Architecture
//! The crate follows a hexagonal layout. **Ports** are the traits at the I/O
//! seams (outbound HTTP, file reads, configuration), **adapters** implement
//! them with hyper, tokio and axum, and **core** holds the proxy and health
//! logic, which only ever talks to the ports.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use arc_swap::ArcSwap;
//! use worker_bridge::{FileSystemAdapter, HttpClientAdapter, HttpHandler, config::ServerConfig};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let config = ServerConfig::builder().worker_url("http://127.0.0.1:8787").build();
//! let handler = HttpHandler::new(
//!     Arc::new(ArcSwap::from_pointee(config)),
//!     Arc::new(HttpClientAdapter::new()?),
//!     Arc::new(FileSystemAdapter::new()),
//! );
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, handler.router()).await?;
//! # Ok(()) }
//! ```
//!
//! # Error Handling
//! Core operations return typed errors ([`ProxyError`](core::ProxyError),
//! [`HttpClientError`](ports::http_client::HttpClientError)); the HTTP surface
//! maps each kind to one status code. Startup and configuration code uses
//! `eyre::Result` with context attached.
pub mod adapters;
pub mod config;
pub mod core;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{FileConfigProvider, FileSystemAdapter, HttpClientAdapter, HttpHandler},
    core::{HealthService, ProxyForwarder},
    ports::http_client::HttpClient,
    utils::GracefulShutdown,
};
