//! Header handling between the two legs of a proxied exchange.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Strip `host` from the outbound leg (the client derives it from the URI)
//! - Relay upstream status and headers to the caller
//!
//! # Design Decisions
//! - `content-length` is treated as hop-by-hop: body framing is recomputed
//!   by the transport from the streamed body
//! - Streaming responses avoid buffering entire body

use axum::{
    body::Body,
    http::{header, response::Parts, HeaderMap, HeaderName},
    response::Response,
};

/// Headers that describe a single transport leg.
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "content-length",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Copy every end-to-end header from `src` into `dst`.
pub fn copy_end_to_end(src: &HeaderMap, dst: &mut HeaderMap) {
    for (name, value) in src {
        if !is_hop_by_hop(name) {
            dst.append(name.clone(), value.clone());
        }
    }
}

/// Headers for the upstream request: end-to-end headers minus `host`.
pub fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    copy_end_to_end(inbound, &mut headers);
    headers.remove(header::HOST);
    headers
}

/// Build the caller-facing response from an upstream response head and body.
///
/// Status is copied verbatim, so upstream 4xx/5xx pass through untouched.
pub fn relay(upstream: Parts, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = upstream.status;
    copy_end_to_end(&upstream.headers, response.headers_mut());
    response
}
