//! End-to-end scenarios: literal venue frames in, book state and feed
//! datagrams out, driven through an in-memory transport.

use std::collections::VecDeque;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use market_gateway::adapter::{BybitAdapter, OkxAdapter};
use market_gateway::config::RetryConfig;
use market_gateway::feed::codec;
use market_gateway::websocket::{Backoff, FrameTransport, ReplayHook};
use market_gateway::{BookManager, Publisher, Venue, VenueConnection};

/// In-memory transport: records outbound frames, serves queued inbound
/// frames, simulates disconnects and reconnect replay.
#[derive(Default)]
struct ScriptedTransport {
    connected: AtomicBool,
    sent: Mutex<Vec<String>>,
    inbound: Mutex<VecDeque<String>>,
    replay: Mutex<Option<ReplayHook>>,
}

impl ScriptedTransport {
    fn new() -> Self {
        let transport = Self::default();
        transport.connected.store(true, Ordering::Relaxed);
        transport
    }

    fn push_inbound(&self, frame: &str) {
        self.inbound.lock().push_back(frame.to_string());
    }

    fn sent_frames(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    /// First connect: the flag flips but nothing is replayed; the owner
    /// sends its stored subscriptions itself.
    fn go_online(&self) {
        self.connected.store(true, Ordering::Relaxed);
    }

    /// Successful reconnect: the replay hook's frames are written to the
    /// stream, exactly like the real I/O task does.
    fn reconnect(&self) {
        self.connected.store(true, Ordering::Relaxed);
        let frames = self
            .replay
            .lock()
            .as_ref()
            .map(|hook| hook())
            .unwrap_or_default();
        self.sent.lock().extend(frames);
    }
}

impl FrameTransport for ScriptedTransport {
    fn send(&self, frame: &str) {
        if self.connected.load(Ordering::Relaxed) {
            self.sent.lock().push(frame.to_string());
        }
    }

    fn next_message(&self) -> Option<String> {
        self.inbound.lock().pop_front()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn set_replay_hook(&self, hook: ReplayHook) {
        *self.replay.lock() = Some(hook);
    }
}

struct Harness {
    conn: VenueConnection<ScriptedTransport>,
    books: Arc<BookManager>,
    receiver: UdpSocket,
}

impl Harness {
    fn new(venue: Venue) -> Self {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let books = Arc::new(BookManager::new());
        let publisher = Arc::new(Publisher::new("127.0.0.1", port).unwrap());
        let conn = match venue {
            Venue::Okx => VenueConnection::new(
                Arc::new(OkxAdapter),
                ScriptedTransport::new(),
                books.clone(),
                publisher,
            ),
            Venue::Bybit => VenueConnection::new(
                Arc::new(BybitAdapter),
                ScriptedTransport::new(),
                books.clone(),
                publisher,
            ),
        };

        Self {
            conn,
            books,
            receiver,
        }
    }

    fn feed(&self, frame: &str) -> usize {
        self.conn.transport().push_inbound(frame);
        self.conn.poll(|_| {})
    }

    fn recv_datagram(&self) -> codec::Datagram {
        let mut buf = [0u8; 4096];
        let (len, _) = self.receiver.recv_from(&mut buf).unwrap();
        codec::decode(&buf[..len]).unwrap()
    }
}

#[test]
fn okx_snapshot_produces_bbo_and_datagram() {
    let harness = Harness::new(Venue::Okx);
    harness.feed(
        r#"{"arg":{"channel":"books5","instId":"ETH-USDT-SWAP"},"data":[{"bids":[["2500.10","1.5"],["2500.00","2.0"]],"asks":[["2500.20","1.0"],["2500.30","3.0"]],"ts":"1700000000000"}]}"#,
    );

    let bbo = harness.books.bbo(Venue::Okx, "ETH-USDT-SWAP").unwrap();
    assert_eq!(bbo.bid_price, 250_010_000_000);
    assert_eq!(bbo.bid_qty, 1.5);
    assert_eq!(bbo.ask_price, 250_020_000_000);
    assert_eq!(bbo.ask_qty, 1.0);

    let datagram = harness.recv_datagram();
    assert_eq!(datagram.msg_type, codec::MSG_TYPE_SNAPSHOT);
    assert_eq!(datagram.venue, Venue::Okx);
    assert_eq!(datagram.symbol, "ETH-USDT-SWAP");
    assert_eq!(datagram.bids.len(), 2);
    assert_eq!(datagram.asks.len(), 2);
    assert_eq!(datagram.bids[0].price, 250_010_000_000);
    assert_eq!(datagram.bids[0].quantity.to_bits(), 1.5f64.to_bits());
    assert_eq!(datagram.asks[1].price, 250_030_000_000);
    assert_eq!(datagram.asks[1].quantity, 3.0);
}

#[test]
fn bybit_delta_deletes_best_ask() {
    let harness = Harness::new(Venue::Bybit);
    harness.feed(
        r#"{"topic":"orderbook.50.ETHUSDT","type":"snapshot","data":{"b":[],"a":[["50000","1.0"],["50001","2.0"]]},"ts":1700000000000}"#,
    );
    harness.feed(
        r#"{"topic":"orderbook.50.ETHUSDT","type":"delta","data":{"b":[],"a":[["50000","0"]]},"ts":1700000001000}"#,
    );

    let book = harness.books.book(Venue::Bybit, "ETHUSDT").unwrap();
    let asks = book.ask_levels();
    assert_eq!(asks.len(), 1);
    assert_eq!(asks[0].price, 5_000_100_000_000);
    assert_eq!(asks[0].quantity, 2.0);
}

#[test]
fn okx_ping_gets_one_pong_and_no_book_apply() {
    let harness = Harness::new(Venue::Okx);
    assert_eq!(harness.feed("ping"), 1);

    assert_eq!(harness.conn.transport().sent_frames(), vec!["pong"]);
    assert!(harness.books.is_empty());
}

#[test]
fn bybit_ack_vs_ping_disambiguation() {
    let harness = Harness::new(Venue::Bybit);

    // Subscription ack echoing `op` must not be answered with a pong.
    harness.feed(r#"{"success":true,"op":"subscribe"}"#);
    assert!(harness.conn.transport().sent_frames().is_empty());

    harness.feed(r#"{"op":"ping"}"#);
    assert_eq!(
        harness.conn.transport().sent_frames(),
        vec![r#"{"op":"pong"}"#]
    );
}

#[test]
fn reconnect_replays_subscriptions_in_order() {
    let harness = Harness::new(Venue::Okx);
    let transport = harness.conn.transport();
    transport.disconnect();

    harness
        .conn
        .subscribe(&["A".to_string(), "B".to_string()], "books5");
    assert!(transport.sent_frames().is_empty());

    // First connect: one subscribe frame per symbol, in order.
    transport.go_online();
    harness.conn.resubscribe();
    let expected = vec![
        r#"{"op":"subscribe","args":[{"channel":"books5","instId":"A"}]}"#.to_string(),
        r#"{"op":"subscribe","args":[{"channel":"books5","instId":"B"}]}"#.to_string(),
    ];
    assert_eq!(transport.sent_frames(), expected);

    // Drop and reconnect: the same two frames again, same order.
    transport.sent.lock().clear();
    transport.disconnect();
    transport.reconnect();
    assert_eq!(transport.sent_frames(), expected);
}

#[test]
fn backoff_schedule_matches_defaults() {
    let mut backoff = Backoff::new(&RetryConfig::default());
    let delays: Vec<u64> = (0..6)
        .map(|_| backoff.next_delay().unwrap().as_millis() as u64)
        .collect();
    assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000, 30000]);
}

#[test]
fn delta_with_empty_sides_does_not_clear_book() {
    let harness = Harness::new(Venue::Bybit);
    harness.feed(
        r#"{"topic":"orderbook.50.ETHUSDT","type":"snapshot","data":{"b":[["49999","1.0"]],"a":[["50001","2.0"]]},"ts":1700000000000}"#,
    );
    harness.feed(
        r#"{"topic":"orderbook.50.ETHUSDT","type":"delta","data":{"b":[],"a":[]},"ts":1700000001000}"#,
    );

    let book = harness.books.book(Venue::Bybit, "ETHUSDT").unwrap();
    assert_eq!(book.depth(), (1, 1));
}

#[test]
fn every_applied_update_is_published() {
    let harness = Harness::new(Venue::Bybit);
    harness.feed(
        r#"{"topic":"orderbook.50.ETHUSDT","type":"snapshot","data":{"b":[["49999","1.0"]],"a":[["50001","2.0"]]},"ts":1700000000000}"#,
    );
    harness.feed(
        r#"{"topic":"orderbook.50.ETHUSDT","type":"delta","data":{"b":[["49999","3.0"]],"a":[]},"ts":1700000001000}"#,
    );

    let first = harness.recv_datagram();
    let second = harness.recv_datagram();
    assert_eq!(first.msg_type, codec::MSG_TYPE_SNAPSHOT);
    assert_eq!(second.msg_type, codec::MSG_TYPE_DELTA);
    assert_eq!(second.bids[0].quantity, 3.0);
    assert!(second.timestamp_ns >= first.timestamp_ns);
}
