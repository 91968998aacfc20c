//! UDP publisher for normalized book updates
//!
//! Best-effort fan-out: the socket is non-blocking, a send that would
//! block is dropped and counted. Serialization reuses a per-thread
//! scratch buffer so the hot path stays allocation-free.

use std::cell::RefCell;
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use tracing::{info, warn};

use super::codec;
use crate::adapter::ParsedBook;
use crate::error::{GatewayError, Result};
use crate::metrics;
use crate::venue::Venue;

thread_local! {
    static SCRATCH: RefCell<Vec<u8>> = RefCell::new(Vec::with_capacity(1024));
}

/// Monotonic nanoseconds since gateway start, stamped into each datagram.
fn monotonic_ns() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

pub struct Publisher {
    socket: Option<UdpSocket>,
    target: SocketAddr,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl Publisher {
    /// Open a non-blocking datagram endpoint towards `address:port`.
    pub fn new(address: &str, port: u16) -> Result<Self> {
        let ip: IpAddr = address
            .parse()
            .map_err(|_| GatewayError::Config(format!("invalid feed address: {}", address)))?;
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.set_nonblocking(true)?;

        info!(target: "system", address = %ip, port, "feed publisher initialized");
        Ok(Self {
            socket: Some(socket),
            target: SocketAddr::new(ip, port),
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        })
    }

    /// A publisher that discards everything, for `UDP_FEED_ENABLED=false`.
    pub fn disabled() -> Self {
        Self {
            socket: None,
            target: SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 0),
            closed: AtomicBool::new(true),
            dropped: AtomicU64::new(0),
        }
    }

    /// Serialize and send one update. Never blocks, never fails: a full
    /// socket buffer or send error drops the datagram.
    pub fn publish(&self, book: &ParsedBook, venue: Venue) {
        if self.closed.load(Ordering::Relaxed) {
            return;
        }
        let Some(socket) = &self.socket else {
            return;
        };

        SCRATCH.with(|scratch| {
            let mut buf = scratch.borrow_mut();
            codec::encode(book, venue, monotonic_ns(), &mut buf);

            match socket.send_to(&buf, self.target) {
                Ok(_) => {
                    metrics::datagrams_sent()
                        .with_label_values(&[venue.name()])
                        .inc();
                }
                Err(e) => {
                    metrics::datagrams_dropped()
                        .with_label_values(&[venue.name()])
                        .inc();
                    let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    if dropped % 1000 == 1 {
                        if e.kind() == ErrorKind::WouldBlock {
                            warn!(target: "system", dropped, "feed send would block, dropping");
                        } else {
                            warn!(target: "system", dropped, error = %e, "feed send failed, dropping");
                        }
                    }
                }
            }
        });
    }

    /// Total datagrams dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop publishing. Safe to call more than once.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::Relaxed) && self.socket.is_some() {
            info!(target: "system", "feed publisher closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}
