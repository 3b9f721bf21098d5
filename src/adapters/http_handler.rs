//! Axum surface: admin page, health report and the Worker proxy.
//!
//! Every request takes one snapshot of the live configuration and hands the
//! derived [`WorkerConfig`](crate::core::WorkerConfig) to the core services, so
//! a reload mid-request is never observed. If the client disconnects, axum
//! drops the handler future and with it the in-flight Worker call.
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    Json, Router,
    body::{Body as AxumBody, Bytes},
    extract::{DefaultBodyLimit, RawQuery, State},
    http::{HeaderMap, Method, Request, Uri},
    response::{Html, IntoResponse, Response},
    routing::{MethodFilter, MethodRouter, get, on},
};
use tower_http::trace::TraceLayer;

use crate::{
    adapters::FileSystemAdapter,
    config::models::ServerConfig,
    core::{HealthReport, HealthService, ProxyForwarder, ProxyRequest, ProxyResponse},
    ports::{
        file_system::{FileSystem, FileSystemError},
        http_client::HttpClient,
        http_server::HandlerError,
    },
    tracing_setup::create_request_span,
};

/// Prefix under which requests are relayed to the Worker.
pub const PROXY_PREFIX: &str = "/proxy";

/// Methods relayed to the Worker; anything else gets 405.
const PROXY_METHODS: MethodFilter = MethodFilter::GET
    .or(MethodFilter::POST)
    .or(MethodFilter::PUT)
    .or(MethodFilter::DELETE)
    .or(MethodFilter::OPTIONS);

/// HTTP handler for the Worker bridge
#[derive(Clone)]
pub struct HttpHandler {
    config: Arc<ArcSwap<ServerConfig>>,
    health_service: Arc<HealthService>,
    proxy_forwarder: Arc<ProxyForwarder>,
    file_system: Arc<FileSystemAdapter>,
}

impl HttpHandler {
    pub fn new(
        config: Arc<ArcSwap<ServerConfig>>,
        http_client: Arc<dyn HttpClient>,
        file_system: Arc<FileSystemAdapter>,
    ) -> Self {
        Self {
            config,
            health_service: Arc::new(HealthService::new(http_client.clone())),
            proxy_forwarder: Arc::new(ProxyForwarder::new(http_client)),
            file_system,
        }
    }

    /// Build the router with request tracing.
    pub fn router(self) -> Router {
        Router::new()
            .route("/", get(index))
            .route("/health", get(health))
            .route(&format!("{PROXY_PREFIX}/"), proxy_route())
            .route(&format!("{PROXY_PREFIX}/{{*path}}"), proxy_route())
            .layer(
                TraceLayer::new_for_http().make_span_with(|req: &Request<AxumBody>| {
                    create_request_span(
                        req.method().as_str(),
                        req.uri().path(),
                        &uuid::Uuid::new_v4().to_string(),
                    )
                }),
            )
            .with_state(self)
    }

    /// Serve the admin page as HTML.
    pub async fn handle_index(&self) -> Result<Html<String>, HandlerError> {
        let config = self.config.load_full();
        let static_files = &config.static_files;

        match self
            .file_system
            .read_text(&static_files.root, &static_files.index_file)
            .await
        {
            Ok(html) => Ok(Html(html)),
            Err(FileSystemError::NotFound(path)) => {
                tracing::debug!("Admin page missing at {}", path);
                Err(HandlerError::NotFound("Admin page not found".to_string()))
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to read admin page");
                Err(HandlerError::InternalError(format!(
                    "Failed to read admin page: {e}"
                )))
            }
        }
    }

    /// Local status plus the Worker probe result.
    pub async fn handle_health(&self) -> HealthReport {
        let worker = self.config.load().worker_config();
        self.health_service.check_health(&worker).await
    }

    /// Relay a request received under [`PROXY_PREFIX`].
    pub async fn handle_proxy(
        &self,
        path: &str,
        request: ProxyRequest,
    ) -> Result<ProxyResponse, HandlerError> {
        let worker = self.config.load().worker_config();
        tracing::debug!("Proxying {} /{}", request.method, path.trim_start_matches('/'));

        Ok(self.proxy_forwarder.forward(&worker, path, request).await?)
    }
}

/// Proxied bodies are relayed whatever their size.
fn proxy_route() -> MethodRouter<HttpHandler> {
    on(PROXY_METHODS, proxy).layer(DefaultBodyLimit::disable())
}

/// Path below the proxy prefix, still percent-encoded.
fn proxied_path(uri: &Uri) -> &str {
    uri.path().strip_prefix(PROXY_PREFIX).unwrap_or_default()
}

async fn index(State(handler): State<HttpHandler>) -> Result<Html<String>, HandlerError> {
    handler.handle_index().await
}

async fn health(State(handler): State<HttpHandler>) -> Json<HealthReport> {
    Json(handler.handle_health().await)
}

async fn proxy(
    State(handler): State<HttpHandler>,
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HandlerError> {
    let request = ProxyRequest::from_parts(method, headers, query.as_deref(), body);
    let response = handler.handle_proxy(proxied_path(&uri), request).await?;
    Ok(relay(response))
}

/// Turn a Worker reply into the client response. Framing headers are
/// regenerated by the server from the buffered body.
fn relay(upstream: ProxyResponse) -> Response {
    let mut response = Response::new(AxumBody::from(upstream.body));
    *response.status_mut() = upstream.status;
    *response.headers_mut() = upstream.headers;
    response
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}
