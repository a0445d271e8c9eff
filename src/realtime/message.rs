//! Inbound frame parsing.
//!
//! Frames are JSON objects discriminated by a `type` field. Text is
//! sanitized before parsing: a leading byte-order mark and every C0/C1
//! control character are removed.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::realtime::RealtimeError;

/// Message type emitted by the backend on every price change.
pub const STOCK_UPDATE: &str = "stock_update";

fn is_stripped(c: char) -> bool {
    matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}')
}

/// Strip a leading BOM and all control characters.
pub fn sanitize(raw: &str) -> Cow<'_, str> {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    if text.chars().any(is_stripped) {
        Cow::Owned(text.chars().filter(|c| !is_stripped(*c)).collect())
    } else {
        Cow::Borrowed(text)
    }
}

/// A parsed frame: its type key (if any) plus the full JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    kind: Option<String>,
    payload: Value,
}

impl InboundMessage {
    pub fn parse(raw: &str) -> Result<Self, RealtimeError> {
        let payload: Value = serde_json::from_str(&sanitize(raw))?;
        let kind = payload
            .get("type")
            .or_else(|| payload.get("kind"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        Ok(Self { kind, payload })
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Typed view of a price change.
    ///
    /// Accepts `stock_update` frames and untyped frames that carry an id and
    /// a price. Frames of any other type are `None`.
    pub fn stock_update(&self) -> Option<StockUpdateMessage> {
        match self.kind() {
            Some(STOCK_UPDATE) | None => serde_json::from_value(self.payload.clone()).ok(),
            Some(_) => None,
        }
    }
}

/// Price change for one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockUpdateMessage {
    #[serde(alias = "stock_id")]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(alias = "price")]
    pub current_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl StockUpdateMessage {
    /// Relative change against `previous_price`, in percent.
    pub fn change_percent(&self) -> Option<f64> {
        self.previous_price
            .filter(|p| *p != 0.0)
            .map(|p| (self.current_price - p) / p * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_bom_and_controls() {
        assert_eq!(sanitize("\u{feff}{\"a\":\u{0001}1}\n"), "{\"a\":1}");
        assert_eq!(sanitize("{\"a\":\u{0085}1}"), "{\"a\":1}");
        assert!(matches!(sanitize("{\"a\":1}"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_parse_reads_type() {
        let msg = InboundMessage::parse("{\"type\":\"stock_update\",\"stock_id\":1,\"price\":2.5}")
            .unwrap();
        assert_eq!(msg.kind(), Some("stock_update"));

        let update = msg.stock_update().unwrap();
        assert_eq!(update.id, 1);
        assert_eq!(update.current_price, 2.5);
        assert_eq!(update.symbol, None);
    }

    #[test]
    fn test_untyped_frame_has_no_kind() {
        let msg = InboundMessage::parse(
            "{\"id\":5,\"current_price\":12.3,\"previous_price\":12.0,\"timestamp\":\"2024-01-01T00:00:00Z\"}",
        )
        .unwrap();
        assert_eq!(msg.kind(), None);
        assert_eq!(msg.payload()["id"], 5);

        let update = msg.stock_update().unwrap();
        assert_eq!(update.id, 5);
        assert_eq!(update.current_price, 12.3);
        assert_eq!(update.previous_price, Some(12.0));
        assert!(update.change_percent().unwrap() > 0.0);
    }

    #[test]
    fn test_stock_update_needs_matching_shape() {
        let other = InboundMessage::parse("{\"type\":\"notice\",\"id\":1,\"price\":2.0}").unwrap();
        assert!(other.stock_update().is_none());

        let no_price = InboundMessage::parse("{\"id\":1,\"message\":\"hi\"}").unwrap();
        assert!(no_price.stock_update().is_none());
    }

    #[test]
    fn test_truncated_frame_is_error() {
        assert!(matches!(
            InboundMessage::parse("{\"type\":\"stock_upd"),
            Err(RealtimeError::Malformed(_))
        ));
    }

    #[test]
    fn test_change_percent() {
        let update = StockUpdateMessage {
            id: 1,
            symbol: Some("ACME".into()),
            current_price: 110.0,
            previous_price: Some(100.0),
            timestamp: None,
        };
        let change = update.change_percent().unwrap();
        assert!((change - 10.0).abs() < 1e-9);
    }
}
