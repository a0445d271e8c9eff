//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Backend the gateway forwards to, with its path rewrite table.
    pub backend: BackendConfig,

    /// Cross-origin policy stamped on every response.
    pub cors: CorsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Real-time update client settings.
    pub realtime: RealtimeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend (e.g., "https://api.example.com").
    pub url: String,

    /// Ordered rewrite rules. First matching prefix wins.
    pub rewrites: Vec<RewriteRuleConfig>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080".to_string(),
            rewrites: vec![RewriteRuleConfig {
                prefix: "/admin".to_string(),
                replacement: "/api/admin".to_string(),
            }],
        }
    }
}

/// A single prefix rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RewriteRuleConfig {
    /// Path prefix to match (case-sensitive).
    pub prefix: String,

    /// Prefix substituted in place of the matched one.
    pub replacement: String,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Value of `Access-Control-Allow-Origin`.
    pub allow_origin: String,

    /// Allowed methods, joined with ", ". `["*"]` allows everything.
    pub allow_methods: Vec<String>,

    /// Allowed request headers, joined with ", ".
    pub allow_headers: Vec<String>,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,

    /// Emit `Access-Control-Allow-Credentials: true`.
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: vec!["*".to_string()],
            allow_headers: vec!["*".to_string()],
            max_age_secs: 86_400,
            allow_credentials: false,
        }
    }
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed until the upstream status line arrives, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Real-time update client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Socket path on the backend.
    pub ws_path: String,

    /// Fixed delay before each reconnect attempt, in milliseconds.
    pub reconnect_delay_ms: u64,

    /// Reconnect attempts allowed before giving up.
    pub max_reconnect_attempts: u32,

    /// Deadline for one socket handshake, in milliseconds. A dial that
    /// overruns it counts as a lost connection.
    pub connect_timeout_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_path: "/ws".to_string(),
            reconnect_delay_ms: 3_000,
            max_reconnect_attempts: 5,
            connect_timeout_ms: 10_000,
        }
    }
}

/// Log output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line layout.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Full,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_published_behaviour() {
        let config = GatewayConfig::default();
        assert_eq!(config.cors.allow_origin, "*");
        assert_eq!(config.cors.max_age_secs, 86_400);
        assert_eq!(config.realtime.reconnect_delay_ms, 3_000);
        assert_eq!(config.realtime.max_reconnect_attempts, 5);
        assert_eq!(
            config.backend.rewrites,
            vec![RewriteRuleConfig {
                prefix: "/admin".into(),
                replacement: "/api/admin".into(),
            }]
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [backend]
            url = "https://backend.example"

            [observability]
            log_format = "compact"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.url, "https://backend.example");
        // `rewrites` omitted inside the table falls back to the default rule set
        assert_eq!(config.backend.rewrites.len(), 1);
        assert_eq!(config.observability.log_format, LogFormat::Compact);
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
    }
}
