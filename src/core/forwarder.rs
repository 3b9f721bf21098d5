//! Reverse proxy to the Worker.
//!
//! [`ProxyForwarder::forward`] turns an inbound [`ProxyRequest`] into one
//! outbound call against the configured Worker and maps the reply back into a
//! [`ProxyResponse`]. Worker replies are relayed whatever their status; only
//! failures to obtain a reply at all are classified into [`ProxyError`].
//! There are no retries.
use std::{sync::Arc, time::Duration};

use axum::body::Body as AxumBody;
use bytes::Bytes;
use hyper::{HeaderMap, Method, Request, StatusCode};
use thiserror::Error;

use crate::{
    core::{
        headers::{outbound_request_headers, relayed_response_headers},
        worker::{QueryParams, WorkerConfig, join_worker_url},
    },
    ports::http_client::{HttpClient, HttpClientError},
};

/// Classified failure of a single forwarded call.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProxyError {
    /// No Worker URL is configured
    #[error("Worker URL is not configured; set worker_url in the configuration first")]
    Configuration,

    /// The Worker did not answer within the proxy budget
    #[error("Worker request timed out after {} seconds: {url}", .timeout.as_secs_f64())]
    UpstreamTimeout { url: String, timeout: Duration },

    /// The Worker answered with an error status that was surfaced as a failure
    #[error("Worker returned error: {body}")]
    UpstreamStatus { status: StatusCode, body: String },

    /// Connection refused, DNS failure, protocol error, ...
    #[error("Worker request failed: {message}")]
    UpstreamTransport { url: String, message: String },

    /// Anything unexpected
    #[error("Proxy request error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status the router answers with for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration => StatusCode::BAD_REQUEST,
            Self::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamStatus { status, .. } => *status,
            Self::UpstreamTransport { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An inbound request to relay.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub query: QueryParams,
    /// `None` when the inbound request carried no body bytes.
    pub body: Option<Bytes>,
}

impl ProxyRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            query: QueryParams::new(),
            body: None,
        }
    }

    /// Assemble from the pieces of an inbound HTTP request.
    ///
    /// A zero-length body is recorded as no body at all.
    pub fn from_parts(
        method: Method,
        headers: HeaderMap,
        raw_query: Option<&str>,
        body: Bytes,
    ) -> Self {
        Self {
            method,
            headers,
            query: raw_query.map(QueryParams::parse).unwrap_or_default(),
            body: (!body.is_empty()).then_some(body),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.body = (!body.is_empty()).then_some(body);
        self
    }
}

/// The Worker's reply, ready to relay.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Proxy Forwarder backing `/proxy/{path}`.
pub struct ProxyForwarder {
    http_client: Arc<dyn HttpClient>,
}

impl ProxyForwarder {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }

    /// Relay `request` to `{worker_url}/{path}`.
    pub async fn forward(
        &self,
        worker: &WorkerConfig,
        path: &str,
        request: ProxyRequest,
    ) -> Result<ProxyResponse, ProxyError> {
        let base = worker.worker_url().ok_or(ProxyError::Configuration)?;
        let target = join_worker_url(base, path);
        let outbound = build_outbound_request(&target, request)?;

        match self
            .http_client
            .send_request(outbound, worker.proxy_timeout())
            .await
        {
            Ok(response) => {
                let (parts, body) = response.into_parts();
                Ok(ProxyResponse {
                    status: parts.status,
                    headers: relayed_response_headers(&parts.headers),
                    body,
                })
            }
            Err(HttpClientError::Timeout(timeout)) => {
                tracing::error!("Worker request timed out: {}", target);
                Err(ProxyError::UpstreamTimeout {
                    url: target,
                    timeout,
                })
            }
            Err(HttpClientError::BackendError { status, body, .. }) => {
                tracing::error!("Worker returned error: {}", status.as_u16());
                Err(ProxyError::UpstreamStatus { status, body })
            }
            Err(HttpClientError::ConnectionError(message)) => {
                tracing::error!("Worker request failed: {}", message);
                Err(ProxyError::UpstreamTransport {
                    url: target,
                    message,
                })
            }
            Err(HttpClientError::InvalidRequest(message)) => {
                tracing::error!("Proxy request error for {}: {}", target, message);
                Err(ProxyError::Internal(message))
            }
        }
    }
}

fn build_outbound_request(
    target: &str,
    request: ProxyRequest,
) -> Result<Request<AxumBody>, ProxyError> {
    let uri = if request.query.is_empty() {
        target.to_string()
    } else {
        format!("{target}?{}", request.query.to_query_string())
    };

    let body = match request.body {
        Some(bytes) => AxumBody::from(bytes),
        None => AxumBody::empty(),
    };

    let mut outbound = Request::builder()
        .method(request.method)
        .uri(&uri)
        .body(body)
        .map_err(|e| ProxyError::Internal(format!("invalid Worker URL {uri}: {e}")))?;
    *outbound.headers_mut() = outbound_request_headers(&request.headers);

    Ok(outbound)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use hyper::{
        Response,
        header::{self, HeaderValue},
    };

    use super::*;
    use crate::ports::http_client::HttpClientResult;

    /// What the mock Worker saw.
    #[derive(Debug, Clone, PartialEq)]
    struct Seen {
        method: Method,
        uri: String,
        headers: HeaderMap,
        body: Bytes,
        timeout: Duration,
    }

    /// Records the outbound request and answers with a fixed outcome.
    struct RecordingClient {
        outcome: fn() -> HttpClientResult<Response<Bytes>>,
        seen: Mutex<Vec<Seen>>,
    }

    impl RecordingClient {
        fn new(outcome: fn() -> HttpClientResult<Response<Bytes>>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last(&self) -> Seen {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl HttpClient for RecordingClient {
        async fn send_request(
            &self,
            req: Request<AxumBody>,
            timeout: Duration,
        ) -> HttpClientResult<Response<Bytes>> {
            let (parts, body) = req.into_parts();
            let body = body.collect().await.unwrap().to_bytes();
            self.seen.lock().unwrap().push(Seen {
                method: parts.method,
                uri: parts.uri.to_string(),
                headers: parts.headers,
                body,
                timeout,
            });
            (self.outcome)()
        }
    }

    fn ok_json() -> HttpClientResult<Response<Bytes>> {
        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, "11")
            .header(header::CONNECTION, "keep-alive")
            .header(header::SET_COOKIE, "a=1")
            .header(header::SET_COOKIE, "b=2")
            .body(Bytes::from_static(b"{\"ok\":true}"))
            .unwrap())
    }

    fn worker() -> WorkerConfig {
        WorkerConfig::new(Some("http://w:9/".to_string()))
    }

    #[tokio::test]
    async fn unconfigured_worker_fails_for_any_request() {
        let client = RecordingClient::new(ok_json);
        let forwarder = ProxyForwarder::new(client.clone());

        for method in [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS] {
            let request = ProxyRequest::new(method).with_body("payload");
            let result = forwarder
                .forward(&WorkerConfig::unconfigured(), "admin/keys", request)
                .await;

            let err = result.unwrap_err();
            assert!(matches!(err, ProxyError::Configuration));
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
            assert!(err.to_string().contains("Worker URL"));
        }
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn forwards_method_path_query_headers_and_body() {
        let client = RecordingClient::new(ok_json);
        let forwarder = ProxyForwarder::new(client.clone());

        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("admin.local"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("7"));
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        headers.insert("x-custom", HeaderValue::from_static("z"));

        let request = ProxyRequest::from_parts(
            Method::POST,
            headers,
            Some("tag=a&tag=b"),
            Bytes::from_static(b"payload"),
        );

        forwarder
            .forward(&worker(), "/admin/keys/", request)
            .await
            .unwrap();

        let seen = client.last();
        assert_eq!(seen.method, Method::POST);
        assert_eq!(seen.uri, "http://w:9/admin/keys?tag=a&tag=b");
        assert_eq!(seen.headers.len(), 1);
        assert_eq!(seen.headers.get("x-custom").unwrap(), "z");
        assert_eq!(seen.body, Bytes::from_static(b"payload"));
        assert_eq!(seen.timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn absent_body_is_not_turned_into_content() {
        let client = RecordingClient::new(ok_json);
        let forwarder = ProxyForwarder::new(client.clone());

        let request = ProxyRequest::from_parts(Method::GET, HeaderMap::new(), None, Bytes::new());
        assert!(request.body.is_none());

        forwarder.forward(&worker(), "api/health", request).await.unwrap();

        let seen = client.last();
        assert!(seen.body.is_empty());
        assert_eq!(seen.uri, "http://w:9/api/health");
    }

    #[tokio::test]
    async fn response_is_relayed_with_framing_headers_removed() {
        let forwarder = ProxyForwarder::new(RecordingClient::new(ok_json));

        let response = forwarder
            .forward(&worker(), "status", ProxyRequest::new(Method::GET))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, Bytes::from_static(b"{\"ok\":true}"));
        assert!(response.headers.get(header::CONTENT_LENGTH).is_none());
        assert!(response.headers.get(header::CONNECTION).is_none());
        assert_eq!(
            response.headers.get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(response.headers.get_all(header::SET_COOKIE).iter().count(), 2);
    }

    #[tokio::test]
    async fn worker_error_status_is_passed_through() {
        let forwarder = ProxyForwarder::new(RecordingClient::new(|| {
            Ok(Response::builder()
                .status(StatusCode::SERVICE_UNAVAILABLE)
                .body(Bytes::from_static(b"busy"))
                .unwrap())
        }));

        let response = forwarder
            .forward(&worker(), "admin/keys", ProxyRequest::new(Method::GET))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.body, Bytes::from_static(b"busy"));
    }

    #[tokio::test]
    async fn timeout_maps_to_gateway_timeout() {
        let forwarder = ProxyForwarder::new(RecordingClient::new(|| {
            Err(HttpClientError::Timeout(Duration::from_secs(30)))
        }));

        let err = forwarder
            .forward(&worker(), "slow", ProxyRequest::new(Method::GET))
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::UpstreamTimeout { ref url, .. } if url == "http://w:9/slow"));
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn connection_failure_maps_to_bad_gateway() {
        let forwarder = ProxyForwarder::new(RecordingClient::new(|| {
            Err(HttpClientError::ConnectionError(
                "tcp connect error: Connection refused".to_string(),
            ))
        }));

        let err = forwarder
            .forward(&worker(), "admin/keys", ProxyRequest::new(Method::DELETE))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("Connection refused"));
    }

    #[tokio::test]
    async fn status_bearing_client_error_keeps_worker_status() {
        let forwarder = ProxyForwarder::new(RecordingClient::new(|| {
            Err(HttpClientError::BackendError {
                url: "http://w:9/admin/keys".to_string(),
                status: StatusCode::TOO_MANY_REQUESTS,
                body: "slow down".to_string(),
            })
        }));

        let err = forwarder
            .forward(&worker(), "admin/keys", ProxyRequest::new(Method::GET))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.to_string(), "Worker returned error: slow down");
    }

    #[tokio::test]
    async fn invalid_request_maps_to_internal_error() {
        let forwarder = ProxyForwarder::new(RecordingClient::new(|| {
            Err(HttpClientError::InvalidRequest("no host".to_string()))
        }));

        let err = forwarder
            .forward(&worker(), "x", ProxyRequest::new(Method::GET))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unparsable_worker_url_is_internal_error() {
        let client = RecordingClient::new(ok_json);
        let forwarder = ProxyForwarder::new(client.clone());
        let worker = WorkerConfig::new(Some("http://bad host".to_string()));

        let err = forwarder
            .forward(&worker, "x", ProxyRequest::new(Method::GET))
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::Internal(_)));
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_calls_are_identical() {
        let client = RecordingClient::new(ok_json);
        let forwarder = ProxyForwarder::new(client.clone());

        let mut headers = HeaderMap::new();
        headers.append("x-trace", HeaderValue::from_static("1"));
        headers.append("x-trace", HeaderValue::from_static("2"));
        let request = ProxyRequest::new(Method::PUT)
            .with_headers(headers)
            .with_query(QueryParams::parse("a=1&b=2"))
            .with_body("same");

        let first = forwarder
            .forward(&worker(), "admin/keys", request.clone())
            .await
            .unwrap();
        let second = forwarder
            .forward(&worker(), "admin/keys", request)
            .await
            .unwrap();

        assert_eq!(first, second);
        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0], seen[1]);
    }
}
