//! Composite health of this service and its Worker.
//!
//! The report always says `"status": "ok"` for the local process. Worker
//! availability is reported alongside it and any probe failure is folded into
//! the report, never returned as an error.
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    core::worker::WorkerConfig,
    ports::http_client::{HttpClient, HttpClientError},
};

/// Upstream state as seen by the last probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    NotConfigured,
    Healthy,
    Error,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub worker_configured: bool,
    pub worker_url: String,
    pub worker_status: WorkerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_initialized: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_error: Option<String>,
}

impl HealthReport {
    fn local(worker: &WorkerConfig) -> Self {
        Self {
            status: "ok".to_string(),
            worker_configured: worker.is_configured(),
            worker_url: worker.configured_url().to_string(),
            worker_status: WorkerStatus::NotConfigured,
            worker_initialized: None,
            worker_error: None,
        }
    }
}

/// Subset of the Worker's own health payload we care about.
#[derive(Debug, Deserialize)]
struct WorkerHealthPayload {
    #[serde(default)]
    initialized: bool,
}

/// Health checker backing the `/health` endpoint.
pub struct HealthService {
    http_client: Arc<dyn HttpClient>,
}

impl HealthService {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }

    /// Build a fresh report, probing the Worker when one is configured.
    pub async fn check_health(&self, worker: &WorkerConfig) -> HealthReport {
        let mut report = HealthReport::local(worker);

        let Some(health_url) = worker.health_url() else {
            return report;
        };

        match self
            .http_client
            .fetch(&health_url, worker.health_timeout())
            .await
        {
            Ok(body) => {
                report.worker_status = WorkerStatus::Healthy;
                report.worker_initialized = Some(parse_initialized(&body));
            }
            Err(HttpClientError::BackendError { status, .. }) => {
                tracing::debug!("Worker health probe returned {}", status);
                report.worker_status = WorkerStatus::Error;
                report.worker_error = Some(format!("HTTP {}", status.as_u16()));
            }
            Err(err) => {
                tracing::warn!("Worker health check failed for {}: {}", health_url, err);
                report.worker_status = WorkerStatus::Error;
                report.worker_error = Some(err.to_string());
            }
        }

        report
    }
}

/// `initialized` from the Worker payload; false when absent or unparsable.
fn parse_initialized(body: &[u8]) -> bool {
    match serde_json::from_slice::<WorkerHealthPayload>(body) {
        Ok(payload) => payload.initialized,
        Err(e) => {
            tracing::debug!("Worker health payload is not usable JSON: {}", e);
            false
        }
    }
}
