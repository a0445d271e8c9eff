//! Upstream target resolution.
//!
//! # Responsibilities
//! - Store the backend base URL and the compiled rewrite table
//! - Rewrite the inbound path with the first matching rule
//! - Produce the absolute upstream URI, query string untouched
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Declared order is match order; first match wins
//! - No match forwards the path verbatim

use axum::http::Uri;
use url::Url;

use crate::config::{BackendConfig, RewriteRuleConfig};
use crate::routing::matcher::{Matcher, PathPrefixMatcher};

/// Error produced when a target cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("invalid backend url '{url}': {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("resolved target '{0}' is not a valid URI")]
    Target(String),
}

/// A compiled prefix → replacement rule.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    matcher: PathPrefixMatcher,
    replacement: String,
}

impl RewriteRule {
    pub fn new(prefix: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            matcher: PathPrefixMatcher::new(prefix),
            replacement: replacement.into(),
        }
    }

    /// Rewrite `path` if this rule applies.
    pub fn apply(&self, path: &str) -> Option<String> {
        if !self.matcher.matches(path) {
            return None;
        }
        self.matcher
            .strip(path)
            .map(|rest| format!("{}{}", self.replacement, rest))
    }
}

impl From<&RewriteRuleConfig> for RewriteRule {
    fn from(config: &RewriteRuleConfig) -> Self {
        Self::new(config.prefix.clone(), config.replacement.clone())
    }
}

/// Backend base URL plus ordered rewrite rules.
#[derive(Debug, Clone)]
pub struct ProxyTarget {
    /// Scheme + authority + optional base path, without trailing slash.
    base: String,
    rules: Vec<RewriteRule>,
}

impl ProxyTarget {
    pub fn new(base_url: &str, rules: Vec<RewriteRule>) -> Result<Self, ResolveError> {
        let parsed = Url::parse(base_url).map_err(|e| ResolveError::BaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() || parsed.host_str().is_none() {
            return Err(ResolveError::BaseUrl {
                url: base_url.to_string(),
                reason: "not an absolute http(s) url".to_string(),
            });
        }

        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
            rules,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, ResolveError> {
        Self::new(
            &config.url,
            config.rewrites.iter().map(RewriteRule::from).collect(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Apply the first matching rule, or return the path unchanged.
    pub fn rewrite_path<'a>(&self, path: &'a str) -> std::borrow::Cow<'a, str> {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(path))
            .map(std::borrow::Cow::Owned)
            .unwrap_or(std::borrow::Cow::Borrowed(path))
    }

    /// Absolute upstream URI for an inbound path and raw query string.
    pub fn resolve(&self, path: &str, query: Option<&str>) -> Result<Uri, ResolveError> {
        let mut target = format!("{}{}", self.base, self.rewrite_path(path));
        if let Some(query) = query {
            target.push('?');
            target.push_str(query);
        }
        target
            .parse::<Uri>()
            .map_err(|_| ResolveError::Target(target))
    }

    /// Same as [`resolve`](Self::resolve) with the scheme swapped to `ws`/`wss`.
    pub fn resolve_ws(&self, path: &str, query: Option<&str>) -> Result<String, ResolveError> {
        let http = self.resolve(path, query)?.to_string();
        Ok(to_ws_scheme(&http))
    }
}

/// `http://` → `ws://`, `https://` → `wss://`; anything else unchanged.
pub fn to_ws_scheme(url: &str) -> String {
    match url.strip_prefix("http") {
        Some(rest) if rest.starts_with("://") || rest.starts_with("s://") => format!("ws{rest}"),
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ProxyTarget {
        ProxyTarget::new(
            "https://backend.example/",
            vec![RewriteRule::new("/admin", "/api/admin")],
        )
        .unwrap()
    }

    #[test]
    fn test_admin_prefix_rewritten() {
        let uri = target().resolve("/admin/users", Some("token=T")).unwrap();
        assert_eq!(uri.to_string(), "https://backend.example/api/admin/users?token=T");
    }

    #[test]
    fn test_unmatched_path_forwarded_verbatim() {
        let uri = target().resolve("/api/stocks", None).unwrap();
        assert_eq!(uri.to_string(), "https://backend.example/api/stocks");
    }

    #[test]
    fn test_first_rule_wins() {
        let target = ProxyTarget::new(
            "http://b",
            vec![
                RewriteRule::new("/admin", "/api/admin"),
                RewriteRule::new("/admin/users", "/users"),
            ],
        )
        .unwrap();
        assert_eq!(target.rewrite_path("/admin/users"), "/api/admin/users");
    }

    #[test]
    fn test_alternate_rule_as_configuration() {
        // The "/api$path" variant expressed as data instead of code
        let target = ProxyTarget::new("http://b", vec![RewriteRule::new("/admin", "/api/admin")])
            .unwrap();
        let legacy = ProxyTarget::new("http://b", vec![RewriteRule::new("/", "/api/")]).unwrap();
        assert_eq!(target.rewrite_path("/admin/x"), legacy.rewrite_path("/admin/x"));
    }

    #[test]
    fn test_base_path_is_kept() {
        let target = ProxyTarget::new("http://b/prefix", vec![]).unwrap();
        assert_eq!(
            target.resolve("/x", None).unwrap().to_string(),
            "http://b/prefix/x"
        );
    }

    #[test]
    fn test_invalid_base_rejected() {
        assert!(matches!(
            ProxyTarget::new("not a url", vec![]),
            Err(ResolveError::BaseUrl { .. })
        ));
    }

    #[test]
    fn test_ws_scheme_swap() {
        assert_eq!(to_ws_scheme("http://b/ws"), "ws://b/ws");
        assert_eq!(to_ws_scheme("https://b/ws?token=a"), "wss://b/ws?token=a");
        assert_eq!(to_ws_scheme("ws://b"), "ws://b");
        assert_eq!(
            target().resolve_ws("/ws", Some("token=a")).unwrap(),
            "wss://backend.example/ws?token=a"
        );
    }
}
