use hyper::StatusCode;
use thiserror::Error;

use crate::core::forwarder::ProxyError;

/// Error type for the HTTP surface; each variant maps to exactly one status
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HandlerError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InternalError(String),
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    GatewayTimeout(String),
    /// The Worker's own status, surfaced with its body text
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },
}

impl HandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream { status, .. } => *status,
        }
    }
}

impl From<ProxyError> for HandlerError {
    fn from(err: ProxyError) -> Self {
        let message = err.to_string();
        match err {
            ProxyError::Configuration => Self::BadRequest(message),
            ProxyError::UpstreamTimeout { .. } => Self::GatewayTimeout(message),
            ProxyError::UpstreamStatus { status, .. } => Self::Upstream { status, message },
            ProxyError::UpstreamTransport { .. } => Self::BadGateway(message),
            ProxyError::Internal(_) => Self::InternalError(message),
        }
    }
}
