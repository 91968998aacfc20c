//! Bybit adapter
//!
//! Public linear feed: book updates arrive on `orderbook.<depth>.<symbol>`
//! topics with levels under `data.b`/`data.a`; heartbeat and subscription
//! acks both use `op`, disambiguated by the presence of `success`.

use serde::Deserialize;

use super::{parse_levels, Endpoint, ParsedBook, SubscriptionAck, VenueAdapter};
use crate::venue::Venue;

#[derive(Debug, Default)]
pub struct BybitAdapter;

#[derive(Debug, Deserialize)]
struct BookMessage {
    topic: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    data: BookData,
    #[serde(default)]
    ts: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BookData {
    #[serde(default)]
    b: Vec<Vec<String>>,
    #[serde(default)]
    a: Vec<Vec<String>>,
    #[serde(default)]
    ts: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OpMessage {
    #[serde(default)]
    op: Option<String>,
    #[serde(default)]
    success: Option<bool>,
}

impl VenueAdapter for BybitAdapter {
    fn venue(&self) -> Venue {
        Venue::Bybit
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: "stream.bybit.com",
            port: 443,
            path: "/v5/public/linear",
        }
    }

    fn parse_book(&self, frame: &str) -> Option<ParsedBook> {
        let msg: BookMessage = serde_json::from_str(frame).ok()?;
        if !msg.topic.contains("orderbook") {
            return None;
        }

        // Symbol is the suffix after the last dot: "orderbook.50.ETHUSDT".
        let instrument = msg.topic.rsplit('.').next()?;
        if instrument.is_empty() || instrument == msg.topic {
            return None;
        }

        Some(ParsedBook {
            instrument: instrument.to_string(),
            is_snapshot: msg.kind.as_deref() == Some("snapshot"),
            timestamp_ms: msg.ts.or(msg.data.ts).unwrap_or(0),
            bids: parse_levels(&msg.data.b)?,
            asks: parse_levels(&msg.data.a)?,
        })
    }

    fn build_subscribe(&self, instrument: &str, channel: &str) -> String {
        format!(r#"{{"op":"subscribe","args":["{}.{}"]}}"#, channel, instrument)
    }

    fn build_unsubscribe(&self, instrument: &str, channel: &str) -> String {
        format!(
            r#"{{"op":"unsubscribe","args":["{}.{}"]}}"#,
            channel, instrument
        )
    }

    fn build_pong(&self, _ping: &str) -> String {
        r#"{"op":"pong"}"#.to_string()
    }

    fn is_ping(&self, frame: &str) -> bool {
        // The subscription ack may echo `op`; a real ping never carries
        // `success`.
        match serde_json::from_str::<OpMessage>(frame) {
            Ok(msg) => msg.op.as_deref() == Some("ping") && msg.success.is_none(),
            Err(_) => false,
        }
    }

    fn is_subscription_ack(&self, frame: &str) -> bool {
        self.parse_ack(frame).is_some()
    }

    fn parse_ack(&self, frame: &str) -> Option<SubscriptionAck> {
        let msg: OpMessage = serde_json::from_str(frame).ok()?;
        let success = msg.success?;
        match msg.op.as_deref() {
            Some("subscribe") | Some("unsubscribe") => Some(SubscriptionAck {
                instrument: None,
                success,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snapshot() {
        let adapter = BybitAdapter;
        let frame = r#"{"topic":"orderbook.50.ETHUSDT","type":"snapshot","data":{"b":[["50000","1.0"],["49999","2.0"]],"a":[["50001","1.5"]]},"ts":1700000000000}"#;
        let book = adapter.parse_book(frame).unwrap();

        assert_eq!(book.instrument, "ETHUSDT");
        assert!(book.is_snapshot);
        assert_eq!(book.timestamp_ms, 1_700_000_000_000);
        assert_eq!(book.bids.len(), 2);
        assert_eq!(book.bids[0].price, 5_000_000_000_000);
        assert_eq!(book.asks[0].quantity, 1.5);
    }

    #[test]
    fn test_parse_delta_with_delete() {
        let adapter = BybitAdapter;
        let frame = r#"{"topic":"orderbook.50.ETHUSDT","type":"delta","data":{"b":[],"a":[["50000","0"]]},"ts":1700000001000}"#;
        let book = adapter.parse_book(frame).unwrap();

        assert!(!book.is_snapshot);
        assert!(book.bids.is_empty());
        assert_eq!(book.asks[0].quantity, 0.0);
    }

    #[test]
    fn test_timestamp_fallback_to_data() {
        let adapter = BybitAdapter;
        let frame = r#"{"topic":"orderbook.50.ETHUSDT","type":"delta","data":{"b":[["50000","1.0"]],"a":[],"ts":1700000002000}}"#;
        assert_eq!(
            adapter.parse_book(frame).unwrap().timestamp_ms,
            1_700_000_002_000
        );
    }

    #[test]
    fn test_non_book_topic_rejected() {
        let adapter = BybitAdapter;
        let frame = r#"{"topic":"tickers.ETHUSDT","type":"snapshot","data":{"b":[],"a":[]}}"#;
        assert!(adapter.parse_book(frame).is_none());
    }

    #[test]
    fn test_ping_vs_ack_disambiguation() {
        let adapter = BybitAdapter;
        let ping = r#"{"op":"ping"}"#;
        let ack = r#"{"success":true,"op":"subscribe"}"#;

        assert!(adapter.is_ping(ping));
        assert!(!adapter.is_subscription_ack(ping));

        assert!(!adapter.is_ping(ack));
        assert!(adapter.is_subscription_ack(ack));

        let parsed = adapter.parse_ack(ack).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.instrument, None);
    }

    #[test]
    fn test_failed_ack() {
        let adapter = BybitAdapter;
        let ack = adapter
            .parse_ack(r#"{"success":false,"op":"subscribe","ret_msg":"error"}"#)
            .unwrap();
        assert!(!ack.success);
    }

    #[test]
    fn test_subscribe_frame() {
        let adapter = BybitAdapter;
        assert_eq!(
            adapter.build_subscribe("ETHUSDT", "orderbook.50"),
            r#"{"op":"subscribe","args":["orderbook.50.ETHUSDT"]}"#
        );
        assert_eq!(
            adapter.build_unsubscribe("ETHUSDT", "orderbook.50"),
            r#"{"op":"unsubscribe","args":["orderbook.50.ETHUSDT"]}"#
        );
        assert_eq!(adapter.build_pong(""), r#"{"op":"pong"}"#);
    }
}
