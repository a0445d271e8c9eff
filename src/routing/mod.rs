//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound path + query
//!     → rewrite.rs (first matching prefix rule)
//!     → matcher.rs (evaluate prefix conditions)
//!     → Return: absolute upstream URI
//!
//! Table Compilation (at startup):
//!     RewriteRuleConfig[]
//!     → Compile matchers in declared order
//!     → Freeze as immutable ProxyTarget
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always resolves to the same target

pub mod matcher;
pub mod rewrite;

pub use rewrite::{to_ws_scheme, ProxyTarget, ResolveError, RewriteRule};
