//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (deadline until the response head arrives)
//!     → On failure: Error Mapper (500 envelope), never retried
//!
//! Real-time socket lost:
//!     → reconnect.rs (fixed delay, bounded attempt budget)
//!     → Exhausted once the budget is spent
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - Proxied requests are never retried (bodies are streamed, not buffered)

pub mod reconnect;
pub mod timeouts;

pub use reconnect::ReconnectPolicy;
pub use timeouts::upstream_deadline;
