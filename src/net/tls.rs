//! TLS setup for outbound connections.
//!
//! Both upstream legs (HTTP forwarding and backend WebSockets) use rustls with
//! the `ring` provider and the bundled webpki root store, so the gateway does
//! not depend on the host's certificate store.

use std::sync::OnceLock;
use std::time::Duration;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;

static CRYPTO_PROVIDER: OnceLock<()> = OnceLock::new();

/// Install `ring` as the process-wide rustls provider.
///
/// Safe to call repeatedly. A provider installed earlier by the embedding
/// application is left in place.
pub fn install_crypto_provider() {
    CRYPTO_PROVIDER.get_or_init(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            tracing::debug!("rustls crypto provider already installed");
        }
    });
}

/// Connector accepting both `http://` and `https://` upstreams.
pub fn https_connector(connect_timeout: Duration) -> HttpsConnector<HttpConnector> {
    install_crypto_provider();

    let mut http = HttpConnector::new();
    // Scheme is enforced by the TLS wrapper, not the TCP connector
    http.enforce_http(false);
    http.set_nodelay(true);
    http.set_connect_timeout(Some(connect_timeout));

    HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(http)
}
