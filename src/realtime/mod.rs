//! Real-time client subsystem.
//!
//! # Data Flow
//! ```text
//! Backend socket
//!     → manager.rs (session, reconnect policy, state)
//!     → message.rs (sanitize, parse)
//!     → dispatcher.rs (type-keyed + wildcard listeners)
//!     → caller callbacks
//! ```

pub mod dispatcher;
pub mod manager;
pub mod message;
pub mod state;

use thiserror::Error;

pub use dispatcher::{Callback, Dispatcher, ListenerId, Subscription, WILDCARD};
pub use manager::ConnectionManager;
pub use message::{sanitize, InboundMessage, StockUpdateMessage, STOCK_UPDATE};
pub use state::ConnectionState;

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("no authentication token available for socket connection")]
    MissingToken,

    #[error("invalid backend url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}
