//! Outbound datagram feed
//!
//! Normalized book updates are packed into a fixed binary format and
//! fanned out over UDP to consumers on the same host, one update per
//! datagram. Dropped datagrams are tolerated by downstream.

pub mod codec;
mod publisher;

pub use codec::{Datagram, FEED_MAGIC, FEED_VERSION};
pub use publisher::Publisher;
