//! Cross-origin policy injection.
//!
//! # Responsibilities
//! - Answer every `OPTIONS` request locally with `200` and an empty body
//! - Stamp the policy headers on every other response, success or failure
//!
//! # Design Decisions
//! - Headers are inserted after the inner service has produced its response,
//!   so nothing copied from upstream can override them
//! - Preflight runs before routing, body extraction and forwarding

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::config::CorsConfig;
use crate::observability::metrics;

/// Pre-rendered CORS response headers.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Self {
        let mut headers = Vec::with_capacity(5);

        let mut push = |name: HeaderName, value: String| match HeaderValue::from_str(&value) {
            Ok(v) => headers.push((name, v)),
            Err(_) => tracing::warn!(header = %name, value = %value, "Skipping invalid CORS header"),
        };

        push(header::ACCESS_CONTROL_ALLOW_ORIGIN, config.allow_origin.clone());
        if !config.allow_methods.is_empty() {
            push(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                config.allow_methods.join(", "),
            );
        }
        if !config.allow_headers.is_empty() {
            push(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                config.allow_headers.join(", "),
            );
        }
        push(header::ACCESS_CONTROL_MAX_AGE, config.max_age_secs.to_string());
        if config.allow_credentials {
            push(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true".to_string());
        }

        Self { headers }
    }

    /// Allow everything: `*` origin, methods and headers, one day max-age.
    pub fn permissive() -> Self {
        Self::from_config(&CorsConfig::default())
    }

    /// Insert the policy headers, replacing any existing values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
    }

    /// `200` with an empty body and the policy headers.
    pub fn preflight(&self) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::OK;
        self.apply(response.headers_mut());
        response
    }
}

/// Middleware applying a [`CorsPolicy`] to the whole router.
pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        tracing::debug!(path = %request.uri().path(), "Answering preflight");
        metrics::record_preflight();
        return policy.preflight();
    }

    let mut response = next.run(request).await;
    policy.apply(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissive_headers() {
        let mut headers = HeaderMap::new();
        CorsPolicy::permissive().apply(&mut headers);

        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
        assert!(!headers.contains_key(header::ACCESS_CONTROL_ALLOW_CREDENTIALS));
    }

    #[test]
    fn test_explicit_lists_and_override() {
        let policy = CorsPolicy::from_config(&CorsConfig {
            allow_origin: "*".into(),
            allow_methods: vec!["GET".into(), "POST".into(), "OPTIONS".into()],
            allow_headers: vec!["Content-Type".into(), "Authorization".into()],
            max_age_secs: 600,
            allow_credentials: true,
        });

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("https://upstream.example"),
        );
        policy.apply(&mut headers);

        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, Authorization"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(
            headers.get_all(header::ACCESS_CONTROL_ALLOW_ORIGIN).iter().count(),
            1
        );
    }

    #[tokio::test]
    async fn test_preflight_is_empty_ok() {
        let response = CorsPolicy::permissive().preflight();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }
}
