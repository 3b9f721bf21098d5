pub mod forwarder;
pub mod headers;
pub mod health;
pub mod worker;

pub use forwarder::{ProxyError, ProxyForwarder, ProxyRequest, ProxyResponse};
pub use health::{HealthReport, HealthService, WorkerStatus};
pub use worker::{QueryParams, WorkerConfig, join_worker_url};
