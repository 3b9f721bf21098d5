//! Header rules applied on each side of the Worker hop.
//!
//! [`HeaderMap`] keys are case-insensitive and keep every value of a repeated
//! header, so filtering is a plain name comparison that never collapses
//! duplicates.
use hyper::{
    HeaderMap,
    header::{self, HeaderName},
};

/// Inbound headers that are never sent to the Worker.
///
/// `host` and `connection` belong to the inbound connection, `content-length`
/// is recomputed from the body actually sent, and `accept-encoding` is dropped
/// so the Worker replies uncompressed.
pub const REQUEST_HEADER_DENYLIST: [HeaderName; 4] = [
    header::HOST,
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::ACCEPT_ENCODING,
];

/// Worker response headers that describe the Worker hop's framing and are
/// regenerated by the server answering the client.
pub const RESPONSE_HEADER_DENYLIST: [HeaderName; 4] = [
    header::CONTENT_ENCODING,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
];

/// Copy `headers`, skipping every name in `denylist`.
pub fn filter_headers(headers: &HeaderMap, denylist: &[HeaderName]) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !denylist.contains(name) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}

/// Headers to send to the Worker for an inbound request.
pub fn outbound_request_headers(inbound: &HeaderMap) -> HeaderMap {
    filter_headers(inbound, &REQUEST_HEADER_DENYLIST)
}

/// Headers to relay to the client from a Worker response.
pub fn relayed_response_headers(upstream: &HeaderMap) -> HeaderMap {
    filter_headers(upstream, &RESPONSE_HEADER_DENYLIST)
}
