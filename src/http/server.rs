//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: local `/health`, everything else proxied
//! - Wire up middleware (CORS, request ID, tracing, panic recovery)
//! - Dispatch plain requests to the forwarder, upgrades to the socket bridge
//! - Bind to a listener and serve until shutdown
//!
//! # Layer Order (outermost first)
//! ```text
//! SetRequestId → Trace → PropagateRequestId → CORS → CatchPanic → handler
//! ```
//! CORS sits outside panic recovery so a crashed handler still produces a
//! response carrying the policy headers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::http::cors::{cors_middleware, CorsPolicy};
use crate::http::error::{self, ProxyError};
use crate::http::forward::{Forwarder, OutgoingRequest};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::websocket;
use crate::observability::metrics;
use crate::routing::ProxyTarget;

/// Application state injected into handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub target: Arc<ProxyTarget>,
    pub forwarder: Forwarder,
    /// Deadline for upstream socket handshakes.
    pub request_timeout: Duration,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
    pub backend: String,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, ProxyError> {
        let target = Arc::new(ProxyTarget::from_config(&config.backend)?);
        let state = AppState {
            target,
            forwarder: Forwarder::new(&config.timeouts),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };
        let cors = Arc::new(CorsPolicy::from_config(&config.cors));

        let router = Self::build_router(state, cors);
        Ok(Self { router, config })
    }

    fn build_router(state: AppState, cors: Arc<CorsPolicy>) -> Router {
        Router::new()
            .route("/health", get(health_handler).fallback(proxy_handler))
            .fallback(proxy_handler)
            .with_state(state)
            .layer(CatchPanicLayer::custom(error::panic_response))
            .layer(middleware::from_fn_with_state(cors, cors_middleware))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.config.backend.url,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        message: "Gateway is running".to_string(),
        backend: state.target.base_url().to_string(),
    })
}

/// Forward any request to the backend.
async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    let start = Instant::now();
    let request_id = request.request_id().to_string();
    let method = request.method().clone();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %request.uri().path(),
        "Proxying request"
    );

    let (mut parts, body) = request.into_parts();
    let result = if websocket::is_upgrade_request(&parts.headers) {
        websocket::bridge(&mut parts, &state).await
    } else {
        match OutgoingRequest::build(&parts, body, &state.target) {
            Ok(outgoing) => state.forwarder.forward(outgoing).await,
            Err(e) => Err(e),
        }
    };

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(request_id = %request_id, path = %parts.uri.path(), "Request failed");
            e.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}
