//! Error mapping for the gateway.
//!
//! Every failure that happens before an upstream status line is received
//! becomes a [`ProxyError`], and `ProxyError` is turned into an HTTP response
//! in exactly one place: its [`IntoResponse`] impl. Upstream 4xx/5xx
//! responses are not errors of the gateway and never pass through here.

use std::any::Any;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::metrics;
use crate::routing::ResolveError;

/// Failure of the gateway itself.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    InvalidTarget(#[from] ResolveError),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    /// Connection refused, DNS failure, TLS failure, reset before response head.
    #[error("{}", error_chain(.0))]
    Upstream(hyper_util::client::legacy::Error),

    #[error("upstream websocket handshake failed: {}", error_chain(.0))]
    WebSocket(tokio_tungstenite::tungstenite::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("handler panicked: {0}")]
    Panic(String),
}

impl ProxyError {
    /// Low-cardinality label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::InvalidTarget(_) => "invalid_target",
            ProxyError::Timeout(_) => "timeout",
            ProxyError::Upstream(e) if e.is_connect() => "connect",
            ProxyError::Upstream(_) => "transport",
            ProxyError::WebSocket(_) => "websocket",
            ProxyError::InvalidRequest(_) => "invalid_request",
            ProxyError::Panic(_) => "panic",
        }
    }
}

impl From<hyper_util::client::legacy::Error> for ProxyError {
    fn from(e: hyper_util::client::legacy::Error) -> Self {
        ProxyError::Upstream(e)
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ProxyError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ProxyError::WebSocket(e)
    }
}

/// Render an error and all of its sources on one line.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = inner.source();
    }
    message
}

/// JSON body of every gateway error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub message: String,
}

impl ErrorEnvelope {
    pub const LABEL: &'static str = "Proxy error";

    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            error: Self::LABEL.to_string(),
            message: if message.is_empty() {
                "unknown error".to_string()
            } else {
                message
            },
        }
    }
}

impl From<&ProxyError> for ErrorEnvelope {
    fn from(err: &ProxyError) -> Self {
        ErrorEnvelope::new(err.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        metrics::record_upstream_error(self.kind());
        tracing::error!(kind = self.kind(), error = %self, "Proxy error");

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorEnvelope::from(&self)),
        )
            .into_response()
    }
}

/// Response used by the panic-catching layer.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ProxyError::Panic(detail).into_response()
}
