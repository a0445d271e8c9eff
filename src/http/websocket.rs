//! WebSocket pass-through.
//!
//! # Responsibilities
//! - Detect WebSocket upgrade requests
//! - Dial the backend socket (same rewrite table, `ws`/`wss` scheme)
//! - Complete the upgrade with the client only after the backend accepted
//! - Bidirectional frame forwarding until either side closes
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Gateway ←──── WebSocket frames ────→ Backend
//! ```
//!
//! # Design Decisions
//! - Frame-level forwarding (no message buffering)
//! - Close frames propagated in both directions
//! - Ping/pong answered per leg, not relayed

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        FromRequestParts,
    },
    http::{
        header::{AUTHORIZATION, COOKIE, UPGRADE},
        request::Parts,
        HeaderMap,
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, client::IntoClientRequest, protocol::frame::coding::CloseCode},
    MaybeTlsStream, WebSocketStream,
};

use crate::http::auth;
use crate::http::error::ProxyError;
use crate::http::server::AppState;
use crate::net;
use crate::resilience::upstream_deadline;

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// True for `Upgrade: websocket` requests.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    headers
        .get(UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

/// Headers sent on the backend handshake: credentials only.
fn handshake_headers(parts: &Parts) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for name in [AUTHORIZATION, COOKIE] {
        for value in parts.headers.get_all(&name) {
            headers.append(name.clone(), value.clone());
        }
    }
    auth::translate_token(parts.uri.query(), &mut headers);
    headers
}

/// Dial the backend and, on success, upgrade the client connection.
pub async fn bridge(parts: &mut Parts, state: &AppState) -> Result<Response, ProxyError> {
    let upgrade = match WebSocketUpgrade::from_request_parts(parts, state).await {
        Ok(upgrade) => upgrade,
        // Malformed handshake from the client, not a gateway failure
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let url = state
        .target
        .resolve_ws(parts.uri.path(), parts.uri.query())?;
    let mut request = url.as_str().into_client_request()?;
    request.headers_mut().extend(handshake_headers(parts));

    net::install_crypto_provider();
    tracing::debug!(target = %url, "Dialing upstream websocket");
    let (upstream, _) = upstream_deadline(state.request_timeout, connect_async(request)).await?;
    tracing::info!(target = %url, "Websocket bridge established");

    Ok(upgrade.on_upgrade(move |client| relay(client, upstream)))
}

async fn relay(client: WebSocket, upstream: UpstreamSocket) {
    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();

    let client_to_upstream = async {
        while let Some(Ok(message)) = client_rx.next().await {
            let closing = matches!(message, Message::Close(_));
            if let Some(frame) = to_upstream(message) {
                if upstream_tx.send(frame).await.is_err() {
                    break;
                }
            }
            if closing {
                break;
            }
        }
    };

    let upstream_to_client = async {
        while let Some(Ok(message)) = upstream_rx.next().await {
            let closing = matches!(message, tungstenite::Message::Close(_));
            if let Some(frame) = to_client(message) {
                if client_tx.send(frame).await.is_err() {
                    break;
                }
            }
            if closing {
                break;
            }
        }
    };

    tokio::select! {
        _ = client_to_upstream => tracing::debug!("Client side of websocket bridge closed"),
        _ = upstream_to_client => tracing::debug!("Upstream side of websocket bridge closed"),
    }
}

fn to_upstream(message: Message) -> Option<tungstenite::Message> {
    match message {
        Message::Text(text) => Some(tungstenite::Message::Text(text.as_str().into())),
        Message::Binary(data) => Some(tungstenite::Message::Binary(data)),
        Message::Close(frame) => Some(tungstenite::Message::Close(frame.map(|f| {
            tungstenite::protocol::CloseFrame {
                code: CloseCode::from(f.code),
                reason: f.reason.as_str().into(),
            }
        }))),
        Message::Ping(_) | Message::Pong(_) => None,
    }
}

fn to_client(message: tungstenite::Message) -> Option<Message> {
    match message {
        tungstenite::Message::Text(text) => Some(Message::Text(text.as_str().into())),
        tungstenite::Message::Binary(data) => Some(Message::Binary(data)),
        tungstenite::Message::Close(frame) => Some(Message::Close(frame.map(|f| CloseFrame {
            code: u16::from(f.code),
            reason: f.reason.as_str().into(),
        }))),
        tungstenite::Message::Ping(_)
        | tungstenite::Message::Pong(_)
        | tungstenite::Message::Frame(_) => None,
    }
}
