//! Upstream request forwarding.
//!
//! # Responsibilities
//! - Derive the outgoing request (target URI, headers, body) from the inbound one
//! - Issue it through a pooled hyper client, HTTP or HTTPS by target scheme
//! - Relay the upstream response without buffering its body

use std::time::Duration;

use axum::{
    body::Body,
    http::{request::Parts, HeaderMap, Method, Request, Uri},
    response::Response,
};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;
use crate::http::auth;
use crate::http::error::ProxyError;
use crate::http::response;
use crate::net;
use crate::resilience::upstream_deadline;
use crate::routing::ProxyTarget;

pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// A fully resolved request ready to be sent upstream.
#[derive(Debug)]
pub struct OutgoingRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Body,
}

impl OutgoingRequest {
    /// Resolve the target, copy end-to-end headers, translate the query token.
    ///
    /// `GET` and `HEAD` never carry a body upstream.
    pub fn build(parts: &Parts, body: Body, target: &ProxyTarget) -> Result<Self, ProxyError> {
        let uri = target.resolve(parts.uri.path(), parts.uri.query())?;

        let mut headers = response::outbound_headers(&parts.headers);
        auth::translate_token(parts.uri.query(), &mut headers);

        let body = if parts.method == Method::GET || parts.method == Method::HEAD {
            Body::empty()
        } else {
            body
        };

        Ok(Self {
            method: parts.method.clone(),
            uri,
            headers,
            body,
        })
    }

    fn into_http(self) -> Request<Body> {
        let mut request = Request::new(self.body);
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;
        request
    }
}

/// Sends [`OutgoingRequest`]s and relays the responses.
#[derive(Clone)]
pub struct Forwarder {
    client: UpstreamClient,
    request_timeout: Duration,
}

impl Forwarder {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let connector = net::https_connector(Duration::from_secs(timeouts.connect_secs));
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(30))
            .build(connector);

        Self {
            client,
            request_timeout: Duration::from_secs(timeouts.request_secs),
        }
    }

    /// Issue the request. Errors are transport failures only; any upstream
    /// status, including 5xx, is an `Ok` response.
    pub async fn forward(&self, outgoing: OutgoingRequest) -> Result<Response, ProxyError> {
        let method = outgoing.method.clone();
        let uri = outgoing.uri.clone();
        tracing::debug!(method = %method, target = %uri, "Forwarding upstream");

        let upstream =
            upstream_deadline(self.request_timeout, self.client.request(outgoing.into_http()))
                .await?;

        tracing::debug!(
            method = %method,
            target = %uri,
            status = %upstream.status(),
            "Upstream responded"
        );

        let (parts, body) = upstream.into_parts();
        Ok(response::relay(parts, Body::new(body)))
    }
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RewriteRule;
    use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH, HOST};

    fn target() -> ProxyTarget {
        ProxyTarget::new("http://backend:8080", vec![RewriteRule::new("/admin", "/api/admin")])
            .unwrap()
    }

    fn parts(method: Method, uri: &str, headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().method(method).uri(uri);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_build_resolves_and_translates() {
        let parts = parts(
            Method::GET,
            "/admin/users?token=T",
            &[("host", "gateway"), ("accept", "application/json")],
        );
        let outgoing = OutgoingRequest::build(&parts, Body::from("ignored"), &target()).unwrap();

        assert_eq!(
            outgoing.uri.to_string(),
            "http://backend:8080/api/admin/users?token=T"
        );
        assert_eq!(outgoing.headers[AUTHORIZATION], "Bearer T");
        assert!(!outgoing.headers.contains_key(HOST));
        assert_eq!(outgoing.headers["accept"], "application/json");

        let body = axum::body::to_bytes(outgoing.body, usize::MAX).await.unwrap();
        assert!(body.is_empty(), "GET bodies are not forwarded");
    }

    #[tokio::test]
    async fn test_build_keeps_raw_body_for_post() {
        let parts = parts(
            Method::POST,
            "/api/upload",
            &[("content-type", "multipart/form-data; boundary=x"), ("content-length", "5")],
        );
        let outgoing =
            OutgoingRequest::build(&parts, Body::from(vec![0xff, 0x00, b'a', b'b', 0x01]), &target())
                .unwrap();

        assert!(!outgoing.headers.contains_key(CONTENT_LENGTH));
        let body = axum::body::to_bytes(outgoing.body, usize::MAX).await.unwrap();
        assert_eq!(&body[..], &[0xff, 0x00, b'a', b'b', 0x01]);
    }
}
