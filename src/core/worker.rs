//! Per-request view of the Worker upstream.
//!
//! A [`WorkerConfig`] is taken from the live [`ServerConfig`](crate::config::ServerConfig)
//! once per inbound request and handed to the health and proxy services by
//! reference. It is never mutated afterwards, so concurrent handlers share
//! nothing but this read-only value.
use std::time::Duration;

use url::form_urlencoded;

/// Default budget for the Worker health probe.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
/// Default budget for a proxied request.
pub const DEFAULT_PROXY_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable Worker settings used while handling a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    configured_url: String,
    worker_url: Option<String>,
    health_timeout: Duration,
    proxy_timeout: Duration,
}

impl WorkerConfig {
    /// Build a snapshot. Blank URLs are treated as "not configured".
    pub fn new(worker_url: Option<String>) -> Self {
        let configured_url = worker_url.unwrap_or_default();
        let worker_url = Some(configured_url.trim())
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        Self {
            configured_url,
            worker_url,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            proxy_timeout: DEFAULT_PROXY_TIMEOUT,
        }
    }

    /// Snapshot with no Worker configured.
    pub fn unconfigured() -> Self {
        Self::new(None)
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn with_proxy_timeout(mut self, timeout: Duration) -> Self {
        self.proxy_timeout = timeout;
        self
    }

    /// The setting exactly as configured; empty when unset.
    pub fn configured_url(&self) -> &str {
        &self.configured_url
    }

    /// The base URL used for requests, if any.
    pub fn worker_url(&self) -> Option<&str> {
        self.worker_url.as_deref()
    }

    pub fn is_configured(&self) -> bool {
        self.worker_url.is_some()
    }

    pub fn health_timeout(&self) -> Duration {
        self.health_timeout
    }

    pub fn proxy_timeout(&self) -> Duration {
        self.proxy_timeout
    }

    /// URL of the Worker's own health endpoint.
    pub fn health_url(&self) -> Option<String> {
        self.worker_url
            .as_deref()
            .map(|base| join_worker_url(base, "api/health"))
    }
}

/// Join the Worker base URL and a relative path with exactly one `/` between them.
///
/// Slashes are trimmed from the end of `base` and from both ends of `path`, so
/// `("http://w:9/", "/admin/keys/")` and `("http://w:9", "admin/keys")` both
/// produce `http://w:9/admin/keys`.
pub fn join_worker_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_matches('/')
    )
}

/// Ordered multi-map of query parameters.
///
/// Keeps duplicate keys and their relative order, which a key-unique map
/// would lose (`?tag=a&tag=b`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw `application/x-www-form-urlencoded` query string.
    pub fn parse(raw: &str) -> Self {
        Self(
            form_urlencoded::parse(raw.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        )
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// All values for `key`, in order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Re-encode as a query string (without the leading `?`).
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.0 {
            serializer.append_pair(k, v);
        }
        serializer.finish()
    }
}

impl FromIterator<(String, String)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
