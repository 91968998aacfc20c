//! Venue adapters
//!
//! Everything exchange-specific lives behind [`VenueAdapter`]: frame
//! classification (ping / subscription ack / book data), order-book
//! parsing, and subscribe/pong generation. The rest of the gateway is
//! venue-agnostic.

mod bybit;
mod okx;

pub use bybit::BybitAdapter;
pub use okx::OkxAdapter;

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::venue::Venue;

/// Fixed-point price scale: 8 decimal places.
pub const PRICE_SCALE: u64 = 100_000_000;

/// Streaming endpoint of a venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub host: &'static str,
    pub port: u16,
    pub path: &'static str,
}

impl Endpoint {
    pub fn url(&self) -> String {
        format!("wss://{}:{}{}", self.host, self.port, self.path)
    }
}

/// A single price level: fixed-point price (decimal × 10^8) and quantity.
/// A zero quantity signals deletion of the level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceLevel {
    pub price: u64,
    pub quantity: f64,
}

/// One parsed order-book message from a venue.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBook {
    pub instrument: String,
    pub is_snapshot: bool,
    pub timestamp_ms: u64,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

/// Outcome extracted from a subscription acknowledgement frame.
///
/// `instrument` is present only when the venue echoes it back (OKX does,
/// Bybit does not).
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionAck {
    pub instrument: Option<String>,
    pub success: bool,
}

/// Capability set every venue adapter implements.
pub trait VenueAdapter: Send + Sync {
    /// The venue this adapter speaks for.
    fn venue(&self) -> Venue;

    /// WebSocket endpoint for the public market-data feed.
    fn endpoint(&self) -> Endpoint;

    /// Try to interpret a frame as an order-book message.
    ///
    /// Returns `None` both for frames that are not book payloads and for
    /// claimed book frames with missing or malformed fields; the caller
    /// discards either silently.
    fn parse_book(&self, frame: &str) -> Option<ParsedBook>;

    /// Subscription request for one instrument on a channel.
    fn build_subscribe(&self, instrument: &str, channel: &str) -> String;

    /// Unsubscription request for one instrument on a channel.
    fn build_unsubscribe(&self, instrument: &str, channel: &str) -> String;

    /// Heartbeat response to a venue ping.
    fn build_pong(&self, ping: &str) -> String;

    /// Whether the frame is a venue heartbeat ping.
    fn is_ping(&self, frame: &str) -> bool;

    /// Whether the frame acknowledges a subscribe/unsubscribe request.
    fn is_subscription_ack(&self, frame: &str) -> bool;

    /// Extract the outcome of a subscription acknowledgement frame.
    fn parse_ack(&self, frame: &str) -> Option<SubscriptionAck>;
}

/// Parse a decimal price string into fixed-point (× 10^8).
pub(crate) fn price_to_fixed(raw: &str) -> Option<u64> {
    let price = Decimal::from_str(raw).ok()?;
    (price * Decimal::from(PRICE_SCALE)).round().to_u64()
}

/// Parse `[price, qty, ...]` string arrays into price levels. Venues may
/// append extra elements (e.g. order counts); only the first two matter.
/// Any malformed entry invalidates the whole batch.
pub(crate) fn parse_levels(raw: &[Vec<String>]) -> Option<Vec<PriceLevel>> {
    raw.iter()
        .map(|entry| {
            let price = price_to_fixed(entry.first()?)?;
            let quantity = entry.get(1)?.parse::<f64>().ok()?;
            Some(PriceLevel { price, quantity })
        })
        .collect()
}
