//! Outbound network setup.
//!
//! # Data Flow
//! ```text
//! Forwarder / ConnectionManager
//!     → tls.rs (crypto provider, root store)
//!     → HttpsConnector (TCP connect with timeout, optional TLS handshake)
//!     → Backend
//! ```
//!
//! # Design Decisions
//! - TLS is optional and selected by the upstream URL scheme
//! - Connect timeout enforced at the TCP layer

pub mod tls;

pub use tls::{https_connector, install_crypto_provider};
