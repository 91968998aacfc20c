//! OKX adapter
//!
//! Public feed message shapes: book updates arrive on the `books-l2-tbt`,
//! `books5`, and `books` channels with string-encoded prices; heartbeat is
//! the literal text `ping`/`pong`; acks carry an `event` field.

use serde::Deserialize;

use super::{parse_levels, Endpoint, ParsedBook, SubscriptionAck, VenueAdapter};
use crate::venue::Venue;

const BOOK_CHANNELS: &[&str] = &["books-l2-tbt", "books5", "books"];

#[derive(Debug, Default)]
pub struct OkxAdapter;

#[derive(Debug, Deserialize)]
struct BookMessage {
    arg: BookArg,
    #[serde(default)]
    action: Option<String>,
    data: Vec<BookData>,
}

#[derive(Debug, Deserialize)]
struct BookArg {
    channel: String,
    #[serde(rename = "instId")]
    inst_id: String,
}

#[derive(Debug, Deserialize)]
struct BookData {
    #[serde(default)]
    bids: Vec<Vec<String>>,
    #[serde(default)]
    asks: Vec<Vec<String>>,
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventMessage {
    event: String,
    #[serde(default)]
    arg: Option<EventArg>,
}

#[derive(Debug, Deserialize)]
struct EventArg {
    #[serde(rename = "instId")]
    inst_id: Option<String>,
}

impl VenueAdapter for OkxAdapter {
    fn venue(&self) -> Venue {
        Venue::Okx
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: "ws.okx.com",
            port: 8443,
            path: "/ws/v5/public",
        }
    }

    fn parse_book(&self, frame: &str) -> Option<ParsedBook> {
        let msg: BookMessage = serde_json::from_str(frame).ok()?;
        if !BOOK_CHANNELS.contains(&msg.arg.channel.as_str()) {
            return None;
        }

        // books5 carries no action field and is always a full snapshot of
        // the top five levels.
        let is_snapshot = match msg.action.as_deref() {
            Some(action) => action == "snapshot",
            None => msg.arg.channel == "books5",
        };

        let data = msg.data.first()?;
        Some(ParsedBook {
            instrument: msg.arg.inst_id,
            is_snapshot,
            timestamp_ms: data
                .ts
                .as_deref()
                .and_then(|ts| ts.parse().ok())
                .unwrap_or(0),
            bids: parse_levels(&data.bids)?,
            asks: parse_levels(&data.asks)?,
        })
    }

    fn build_subscribe(&self, instrument: &str, channel: &str) -> String {
        format!(
            r#"{{"op":"subscribe","args":[{{"channel":"{}","instId":"{}"}}]}}"#,
            channel, instrument
        )
    }

    fn build_unsubscribe(&self, instrument: &str, channel: &str) -> String {
        format!(
            r#"{{"op":"unsubscribe","args":[{{"channel":"{}","instId":"{}"}}]}}"#,
            channel, instrument
        )
    }

    fn build_pong(&self, _ping: &str) -> String {
        "pong".to_string()
    }

    fn is_ping(&self, frame: &str) -> bool {
        // OKX heartbeats are plain text, not JSON.
        frame == "ping"
    }

    fn is_subscription_ack(&self, frame: &str) -> bool {
        self.parse_ack(frame).is_some()
    }

    fn parse_ack(&self, frame: &str) -> Option<SubscriptionAck> {
        let msg: EventMessage = serde_json::from_str(frame).ok()?;
        let success = match msg.event.as_str() {
            "subscribe" | "unsubscribe" => true,
            "error" => false,
            _ => return None,
        };
        Some(SubscriptionAck {
            instrument: msg.arg.and_then(|arg| arg.inst_id),
            success,
        })
    }
}
