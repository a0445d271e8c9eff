//! Edge gateway and real-time client for the stock trading frontend.
//!
//! The gateway fronts a single backend: it answers CORS preflights and
//! `/health` locally, rewrites legacy paths, turns `?token=` into a bearer
//! header and streams everything else through. The `realtime` module is the
//! client half: one managed socket to the backend with bounded reconnects
//! and type-keyed message fan-out.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Client
pub mod realtime;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use realtime::{ConnectionManager, ConnectionState, Dispatcher};
