use std::{error::Error as StdError, time::Duration};

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use bytes::Bytes;
use eyre::Result;
use http_body_util::BodyExt;
use hyper::{
    Request, Response, Version,
    header::{ACCEPT_ENCODING, HeaderValue},
};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use rustls_native_certs::load_native_certs;
use tower::{ServiceExt, util::MapRequest};
use tower_http::decompression::Decompression;
use tracing::Instrument;

use crate::ports::http_client::{HttpClient, HttpClientError, HttpClientResult};

/// HTTP client adapter using Hyper with Rustls.
///
/// Responsibilities:
/// * Regenerates the `Host` header from the outgoing URI
/// * Forces request version to HTTP/1.1
/// * Never asks for a compressed reply, but decodes one (gzip, deflate, br,
///   zstd) if the Worker sends it anyway, so relayed bodies are always plain
/// * Buffers the full response body inside the caller's timeout budget
///
/// The underlying client is pooled and cheap to clone, so concurrent calls
/// never serialize on a shared connection. There are no retries here; a single
/// failed exchange is reported as-is.
#[derive(Clone)]
pub struct HttpClientAdapter {
    client: WorkerService,
}

type WorkerService = Decompression<
    MapRequest<
        Client<HttpsConnector<HttpConnector>, AxumBody>,
        fn(Request<AxumBody>) -> Request<AxumBody>,
    >,
>;

/// Runs below the decompression layer, so the `accept-encoding` it adds never
/// reaches the Worker.
fn strip_accept_encoding(mut req: Request<AxumBody>) -> Request<AxumBody> {
    req.headers_mut().remove(ACCEPT_ENCODING);
    req
}

impl HttpClientAdapter {
    /// Create a new HTTP client adapter.
    pub fn new() -> Result<Self> {
        // Install default crypto provider for rustls if not already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false); // Allow HTTPS URLs

        let mut root_cert_store = rustls::RootCertStore::empty();
        let native_certs = load_native_certs();

        if !native_certs.certs.is_empty() {
            for cert in native_certs.certs {
                if root_cert_store.add(cert).is_err() {
                    tracing::warn!("Failed to add native certificate to rustls RootCertStore");
                }
            }
            tracing::debug!("Loaded {} native root certificates.", root_cert_store.len());
        }

        if !native_certs.errors.is_empty() {
            tracing::warn!(
                "Some native certificates failed to load: {:?}",
                native_certs.errors
            );
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, AxumBody>(https_connector);
        let client = Decompression::new(MapRequest::new(
            client,
            strip_accept_encoding as fn(Request<AxumBody>) -> Request<AxumBody>,
        ));

        tracing::info!("Created Worker HTTP client");
        Ok(Self { client })
    }

    /// Set `Host` from the URI authority, since inbound hop headers are never relayed.
    fn set_host_header(req: &mut Request<AxumBody>) -> HttpClientResult<()> {
        let Some(host_str) = req.uri().host() else {
            return Err(HttpClientError::InvalidRequest(format!(
                "Outgoing URI has no host: {}",
                req.uri()
            )));
        };

        let host_value = match req.uri().port() {
            Some(port) => format!("{host_str}:{}", port.as_u16()),
            None => host_str.to_string(),
        };
        let host_header = HeaderValue::from_str(&host_value)
            .map_err(|e| HttpClientError::InvalidRequest(format!("Invalid host: {e}")))?;
        req.headers_mut().insert(hyper::header::HOST, host_header);
        Ok(())
    }
}

/// Render an error and its source chain, e.g.
/// `client error (Connect): tcp connect error: Connection refused (os error 111)`.
pub(crate) fn describe_error(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

#[async_trait]
impl HttpClient for HttpClientAdapter {
    async fn send_request(
        &self,
        mut req: Request<AxumBody>,
        timeout: Duration,
    ) -> HttpClientResult<Response<Bytes>> {
        Self::set_host_header(&mut req)?;
        *req.version_mut() = Version::HTTP_11;

        let method = req.method().clone();
        let uri = req.uri().clone();
        let span = tracing::info_span!(
            "worker_request",
            http.method = %method,
            http.url = %uri,
            http.status_code = tracing::field::Empty,
        );

        tracing::debug!(parent: &span, "Outgoing request headers: {:?}", req.headers());

        let client = self.client.clone();
        let exchange = async move {
            let response = client.oneshot(req).await.map_err(|e| {
                HttpClientError::ConnectionError(format!(
                    "{method} {uri} failed: {}",
                    describe_error(&e)
                ))
            })?;

            tracing::Span::current().record("http.status_code", response.status().as_u16());

            let (parts, body) = response.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| {
                    HttpClientError::ConnectionError(format!(
                        "reading response body from {uri} failed: {}",
                        describe_error(&*e)
                    ))
                })?
                .to_bytes();

            Ok(Response::from_parts(parts, body))
        };

        match tokio::time::timeout(timeout, exchange.instrument(span)).await {
            Ok(result) => result,
            Err(_) => Err(HttpClientError::Timeout(timeout)),
        }
    }
}
