//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers, /health)
//!     → request.rs (request ID)
//!     → cors.rs (preflight short-circuit, policy headers)
//!     → forward.rs (rewrite, token → bearer, stream upstream)
//!       or websocket.rs (upgrade bridge)
//!     → response.rs (hop-by-hop filtering)
//!     → error.rs (gateway failures → 500 envelope)
//!     → Send to client
//! ```

pub mod auth;
pub mod cors;
pub mod error;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use cors::CorsPolicy;
pub use error::{ErrorEnvelope, ProxyError};
pub use forward::{Forwarder, OutgoingRequest};
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HealthStatus, HttpServer};
