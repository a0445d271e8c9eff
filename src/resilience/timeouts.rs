//! Timeout enforcement.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - The deadline covers connect + request write + response head; the
//!   streamed body is not bounded
//! - Timeout errors are distinct from other transport errors

use std::future::Future;
use std::time::Duration;

use crate::http::error::ProxyError;

/// Await an upstream call, failing with [`ProxyError::Timeout`] after `limit`.
pub async fn upstream_deadline<F, T, E>(limit: Duration, call: F) -> Result<T, ProxyError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<ProxyError>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(ProxyError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, ProxyError>(())
        };
        let err = upstream_deadline(Duration::from_secs(1), slow).await.unwrap_err();
        assert!(matches!(err, ProxyError::Timeout(d) if d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let failing = async { Err::<(), _>(ProxyError::InvalidRequest("bad".into())) };
        let err = upstream_deadline(Duration::from_secs(1), failing).await.unwrap_err();
        assert!(matches!(err, ProxyError::InvalidRequest(_)));
    }
}
