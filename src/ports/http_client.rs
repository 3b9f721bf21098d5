use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use bytes::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use thiserror::Error;

/// Custom error type for HTTP client operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpClientError {
    /// Error when connection to the Worker fails
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error when the exchange did not finish within its budget
    #[error("Timeout error after {} seconds", .0.as_secs_f64())]
    Timeout(Duration),

    /// Error when request is invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Error when the Worker answers with a non-success status
    #[error("Worker returned error status: {status}, url: {url}")]
    BackendError {
        /// The URL that was requested
        url: String,
        /// The status code returned by the Worker
        status: StatusCode,
        /// Response body, lossily decoded as UTF-8
        body: String,
    },
}

/// Result type alias for HTTP client operations
pub type HttpClientResult<T> = Result<T, HttpClientError>;

/// HttpClient defines the port (interface) for making HTTP requests to the Worker
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// Send a request and buffer the whole response.
    ///
    /// Every status code is returned as `Ok`; only transport failures and
    /// timeouts are errors. The timeout covers connecting, sending and
    /// reading the full body. When it expires the in-flight call is dropped.
    async fn send_request(
        &self,
        req: Request<AxumBody>,
        timeout: Duration,
    ) -> HttpClientResult<Response<Bytes>>;

    /// GET `url` and return the body of a `200 OK` response.
    ///
    /// Any other status becomes [`HttpClientError::BackendError`].
    async fn fetch(&self, url: &str, timeout: Duration) -> HttpClientResult<Bytes> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(url)
            .body(AxumBody::empty())
            .map_err(|e| HttpClientError::InvalidRequest(e.to_string()))?;

        let response = self.send_request(request, timeout).await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(HttpClientError::BackendError {
                url: url.to_string(),
                status,
                body: String::from_utf8_lossy(response.body()).into_owned(),
            });
        }

        Ok(response.into_body())
    }
}
