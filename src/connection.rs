//! Venue connection
//!
//! Binds one adapter to one transport and routes every inbound frame:
//! heartbeats are answered, subscription acks update the records, book
//! messages are published and applied, anything else is discarded. The
//! connection owns the authoritative subscription list used for replay
//! after reconnects.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::adapter::{ParsedBook, VenueAdapter};
use crate::feed::Publisher;
use crate::orderbook::BookManager;
use crate::venue::Venue;
use crate::websocket::{FrameTransport, WsClient};

/// Lifecycle of one subscription request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Subscription {
    pub instrument: String,
    pub channel: String,
    pub state: SubscriptionState,
}

pub struct VenueConnection<T: FrameTransport> {
    venue: Venue,
    adapter: Arc<dyn VenueAdapter>,
    transport: T,
    books: Arc<BookManager>,
    publisher: Arc<Publisher>,
    subscriptions: Arc<RwLock<Vec<Subscription>>>,
}

impl<T: FrameTransport> VenueConnection<T> {
    pub fn new(
        adapter: Arc<dyn VenueAdapter>,
        transport: T,
        books: Arc<BookManager>,
        publisher: Arc<Publisher>,
    ) -> Self {
        let conn = Self {
            venue: adapter.venue(),
            adapter,
            transport,
            books,
            publisher,
            subscriptions: Arc::new(RwLock::new(Vec::new())),
        };
        conn.install_replay_hook();
        conn
    }

    /// On every reconnect the transport re-emits one subscribe frame per
    /// stored record, in registration order, and the records go back to
    /// Pending until the venue acks them again.
    fn install_replay_hook(&self) {
        let subscriptions = self.subscriptions.clone();
        let adapter = self.adapter.clone();
        self.transport.set_replay_hook(Box::new(move || {
            let mut subs = subscriptions.write();
            subs.iter_mut()
                .map(|sub| {
                    sub.state = SubscriptionState::Pending;
                    adapter.build_subscribe(&sub.instrument, &sub.channel)
                })
                .collect()
        }));
    }

    /// Register instruments on a channel. Records are stored first so they
    /// survive (and get replayed across) reconnects; frames go out now
    /// only if the transport is connected.
    pub fn subscribe(&self, instruments: &[String], channel: &str) {
        {
            let mut subs = self.subscriptions.write();
            for instrument in instruments {
                subs.push(Subscription {
                    instrument: instrument.clone(),
                    channel: channel.to_string(),
                    state: SubscriptionState::Pending,
                });
            }
        }
        info!(
            target: "system",
            venue = %self.venue,
            channel,
            count = instruments.len(),
            "subscriptions registered"
        );

        if !self.transport.is_connected() {
            debug!(
                target: "system",
                venue = %self.venue,
                "not connected, subscriptions will be sent on connect"
            );
            return;
        }
        for instrument in instruments {
            let frame = self.adapter.build_subscribe(instrument, channel);
            self.transport.send(&frame);
        }
    }

    /// Send subscribe frames for every stored record, in registration
    /// order. Used after the first successful connect.
    pub fn resubscribe(&self) {
        let subs = self.subscriptions.read();
        for sub in subs.iter() {
            let frame = self.adapter.build_subscribe(&sub.instrument, &sub.channel);
            self.transport.send(&frame);
        }
    }

    /// Drain the inbound queue, dispatching every frame. The callback
    /// observes each parsed book after it has been published and applied.
    /// Returns the number of frames handled.
    pub fn poll<F: FnMut(&ParsedBook)>(&self, mut on_book: F) -> usize {
        let mut handled = 0;
        while let Some(frame) = self.transport.next_message() {
            self.process_frame(&frame, &mut on_book);
            handled += 1;
        }
        handled
    }

    pub(crate) fn process_frame<F: FnMut(&ParsedBook)>(&self, frame: &str, on_book: &mut F) {
        if self.adapter.is_ping(frame) {
            let pong = self.adapter.build_pong(frame);
            self.transport.send(&pong);
            debug!(target: "system", venue = %self.venue, "ping answered");
            return;
        }

        if self.adapter.is_subscription_ack(frame) {
            self.handle_ack(frame);
            return;
        }

        if let Some(book) = self.adapter.parse_book(frame) {
            self.publisher.publish(&book, self.venue);
            self.books.apply(self.venue, &book);
            debug!(
                target: "price",
                venue = %self.venue,
                instrument = %book.instrument,
                snapshot = book.is_snapshot,
                bids = book.bids.len(),
                asks = book.asks.len(),
                "book update applied"
            );
            on_book(&book);
            return;
        }

        // Unknown message types are expected as venues evolve.
        debug!(
            target: "system",
            venue = %self.venue,
            len = frame.len(),
            "discarding unrecognized frame"
        );
    }

    fn handle_ack(&self, frame: &str) {
        let Some(ack) = self.adapter.parse_ack(frame) else {
            debug!(target: "system", venue = %self.venue, "unreadable subscription ack");
            return;
        };

        let next = if ack.success {
            SubscriptionState::Confirmed
        } else {
            SubscriptionState::Failed
        };
        let mut subs = self.subscriptions.write();
        match &ack.instrument {
            Some(instrument) => {
                for sub in subs.iter_mut().filter(|s| s.instrument == *instrument) {
                    sub.state = next;
                }
            }
            // Venues that do not echo the instrument (Bybit) ack the whole
            // pending batch.
            None => {
                for sub in subs.iter_mut().filter(|s| s.state == SubscriptionState::Pending) {
                    sub.state = next;
                }
            }
        }

        if ack.success {
            info!(
                target: "system",
                venue = %self.venue,
                instrument = ack.instrument.as_deref().unwrap_or("*"),
                "subscription confirmed"
            );
        } else {
            warn!(
                target: "system",
                venue = %self.venue,
                instrument = ack.instrument.as_deref().unwrap_or("*"),
                "subscription rejected"
            );
        }
    }

    /// Snapshot of the subscription records.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions.read().clone()
    }

    pub fn venue(&self) -> Venue {
        self.venue
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl VenueConnection<WsClient> {
    /// First connect. On synchronous success the stored subscriptions are
    /// sent; reconnects replay them through the hook.
    pub async fn connect(&self) -> bool {
        let connected = self.transport.connect().await;
        if connected {
            self.resubscribe();
        } else {
            warn!(
                target: "system",
                venue = %self.venue,
                "initial connect failed, retrying in background"
            );
        }
        connected
    }

    /// Graceful disconnect: stops the transport and clears the
    /// subscription records.
    pub async fn close(&self) {
        self.transport.close().await;
        self.subscriptions.write().clear();
        info!(target: "system", venue = %self.venue, "venue connection closed");
    }

    pub fn state(&self) -> crate::websocket::ConnState {
        self.transport.state()
    }
}
