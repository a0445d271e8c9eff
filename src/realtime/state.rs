//! Connection lifecycle states.

use std::fmt;

/// State of the client's single socket session.
///
/// ```text
/// Disconnected → Connecting → Connected ─┐
///      ↑              ↑                  │ close / error
///      │              └── Reconnecting ←─┘
///      │                      │ budget spent
///      └── disconnect() ── Exhausted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Waiting out the delay before reconnect attempt `attempt`.
    Reconnecting { attempt: u32 },
    /// Terminal until the next explicit `connect()`.
    Exhausted,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// True once no further reconnects will be attempted on their own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Exhausted)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("disconnected"),
            ConnectionState::Connecting => f.write_str("connecting"),
            ConnectionState::Connected => f.write_str("connected"),
            ConnectionState::Reconnecting { attempt } => write!(f, "reconnecting ({attempt})"),
            ConnectionState::Exhausted => f.write_str("exhausted"),
        }
    }
}
