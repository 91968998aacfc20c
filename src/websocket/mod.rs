//! WebSocket transport
//!
//! One TLS-secured text-frame connection per venue, driven by a dedicated
//! I/O task with automatic reconnection and subscription replay.

mod backoff;
mod client;

pub use backoff::Backoff;
pub use client::{ConnState, WsClient, INBOUND_QUEUE_CAPACITY};

/// Frames to re-send after a successful reconnect, produced by the owning
/// connection.
pub type ReplayHook = Box<dyn Fn() -> Vec<String> + Send + Sync>;

/// Seam between a venue connection and its transport.
///
/// The production implementation is [`WsClient`]; tests drive the dispatch
/// logic through an in-memory fake.
pub trait FrameTransport: Send + Sync {
    /// Enqueue a text frame for transmission. Dropped silently when not
    /// connected; the owner replays subscriptions after reconnect.
    fn send(&self, frame: &str);

    /// Non-blocking pop from the inbound queue.
    fn next_message(&self) -> Option<String>;

    fn is_connected(&self) -> bool;

    /// Register the frames to replay on every reconnect after the first
    /// successful connect.
    fn set_replay_hook(&self, hook: ReplayHook);
}
