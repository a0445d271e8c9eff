//! Query-token to bearer-header translation.
//!
//! Browsers cannot attach headers to some requests (downloads, socket
//! handshakes), so clients pass their credential as `?token=`. The gateway
//! turns it into `Authorization: Bearer <token>` unless the caller already
//! sent an `Authorization` header. The query parameter itself is forwarded
//! untouched.

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};
use url::form_urlencoded;

/// Query parameter carrying the credential.
pub const TOKEN_PARAM: &str = "token";

/// Opaque credential taken from the query string.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// First non-empty `token` value in a raw query string.
    pub fn from_query(query: Option<&str>) -> Option<Self> {
        form_urlencoded::parse(query?.as_bytes())
            .find(|(key, value)| key == TOKEN_PARAM && !value.is_empty())
            .map(|(_, value)| AuthToken(value.into_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Bearer <token>`, or `None` if the token cannot be a header value.
    pub fn bearer(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&format!("Bearer {}", self.0)).ok()
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Synthesize `Authorization` from the query token. Returns true if a header
/// was added. An existing `Authorization` header is never replaced.
pub fn translate_token(query: Option<&str>, headers: &mut HeaderMap) -> bool {
    if headers.contains_key(AUTHORIZATION) {
        return false;
    }
    let Some(token) = AuthToken::from_query(query) else {
        return false;
    };

    match token.bearer() {
        Some(value) => {
            headers.insert(AUTHORIZATION, value);
            tracing::debug!("Added Authorization header from query token");
            true
        }
        None => {
            tracing::warn!("Query token is not a valid header value, ignoring");
            false
        }
    }
}
