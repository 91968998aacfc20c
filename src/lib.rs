//! Market Data Gateway Library
//!
//! This crate connects to multiple derivative exchanges (OKX, Bybit) over
//! TLS WebSocket, maintains a locally-consistent order book per (venue,
//! instrument), and republishes normalized updates as binary datagrams
//! over a local UDP feed.

pub mod adapter;
pub mod config;
pub mod connection;
pub mod error;
pub mod feed;
pub mod logging;
pub mod metrics;
pub mod orderbook;
pub mod supervisor;
pub mod venue;
pub mod websocket;

pub use adapter::{BybitAdapter, OkxAdapter, ParsedBook, PriceLevel, VenueAdapter};
pub use config::Config;
pub use connection::{Subscription, SubscriptionState, VenueConnection};
pub use error::{GatewayError, Result};
pub use feed::Publisher;
pub use orderbook::{Bbo, BookManager, OrderBook};
pub use supervisor::Supervisor;
pub use venue::Venue;
pub use websocket::{ConnState, FrameTransport, WsClient};
