//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect conflicting rewrite rules
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("backend.url '{url}' is invalid: {reason}")]
    BackendUrl { url: String, reason: String },

    #[error("rewrite rule #{index}: {field} '{value}' must start with '/'")]
    RewritePath {
        index: usize,
        field: &'static str,
        value: String,
    },

    #[error("rewrite rule #{index}: prefix '{prefix}' is already declared")]
    DuplicatePrefix { index: usize, prefix: String },

    #[error("cors.{field} contains a value that is not a valid header value")]
    CorsHeader { field: &'static str },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("realtime.ws_path '{0}' must start with '/'")]
    WsPath(String),
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    match Url::parse(&config.backend.url) {
        Ok(url) if !matches!(url.scheme(), "http" | "https") => {
            errors.push(ValidationError::BackendUrl {
                url: config.backend.url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(url) if url.host_str().is_none() => {
            errors.push(ValidationError::BackendUrl {
                url: config.backend.url.clone(),
                reason: "missing host".to_string(),
            });
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::BackendUrl {
            url: config.backend.url.clone(),
            reason: e.to_string(),
        }),
    }

    let mut seen = HashSet::new();
    for (index, rule) in config.backend.rewrites.iter().enumerate() {
        if !rule.prefix.starts_with('/') {
            errors.push(ValidationError::RewritePath {
                index,
                field: "prefix",
                value: rule.prefix.clone(),
            });
        }
        if !rule.replacement.starts_with('/') {
            errors.push(ValidationError::RewritePath {
                index,
                field: "replacement",
                value: rule.replacement.clone(),
            });
        }
        if !seen.insert(rule.prefix.as_str()) {
            errors.push(ValidationError::DuplicatePrefix {
                index,
                prefix: rule.prefix.clone(),
            });
        }
    }

    let header_safe = |s: &str| axum::http::HeaderValue::from_str(s).is_ok();
    if !header_safe(&config.cors.allow_origin) {
        errors.push(ValidationError::CorsHeader { field: "allow_origin" });
    }
    if !config.cors.allow_methods.iter().all(|m| header_safe(m)) {
        errors.push(ValidationError::CorsHeader { field: "allow_methods" });
    }
    if !config.cors.allow_headers.iter().all(|h| header_safe(h)) {
        errors.push(ValidationError::CorsHeader { field: "allow_headers" });
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.request_secs"));
    }

    if config.realtime.connect_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout("realtime.connect_timeout_ms"));
    }
    if !config.realtime.ws_path.starts_with('/') {
        errors.push(ValidationError::WsPath(config.realtime.ws_path.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
