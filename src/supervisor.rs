//! Supervisor
//!
//! Builds the shared publisher and book registry, one venue connection
//! per configured venue, and drives startup and orderly shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::adapter::{BybitAdapter, OkxAdapter, VenueAdapter};
use crate::config::Config;
use crate::connection::VenueConnection;
use crate::error::Result;
use crate::feed::Publisher;
use crate::orderbook::BookManager;
use crate::venue::Venue;
use crate::websocket::WsClient;

const OKX_BOOK_CHANNEL: &str = "books5";
const BYBIT_BOOK_CHANNEL: &str = "orderbook.50";

/// Dispatch loop sleep while the inbound queue is empty.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct Supervisor {
    config: Arc<Config>,
    books: Arc<BookManager>,
    publisher: Arc<Publisher>,
    connections: Vec<Arc<VenueConnection<WsClient>>>,
    dispatch_tasks: Vec<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl Supervisor {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let publisher = Arc::new(if config.feed.enabled {
            Publisher::new(&config.feed.address, config.feed.port)?
        } else {
            Publisher::disabled()
        });
        let books = Arc::new(BookManager::new());

        let adapters: Vec<Arc<dyn VenueAdapter>> =
            vec![Arc::new(OkxAdapter), Arc::new(BybitAdapter)];
        let connections = adapters
            .into_iter()
            .map(|adapter| {
                let client = WsClient::new(
                    adapter.endpoint(),
                    config.retry.clone(),
                    adapter.venue().name(),
                );
                Arc::new(VenueConnection::new(
                    adapter,
                    client,
                    books.clone(),
                    publisher.clone(),
                ))
            })
            .collect();

        Ok(Self {
            config,
            books,
            publisher,
            connections,
            dispatch_tasks: Vec::new(),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Register configured instruments, initiate the first connects, and
    /// start one dispatch task per venue.
    pub async fn start(&mut self) {
        for conn in &self.connections {
            let (symbols, channel) = match conn.venue() {
                Venue::Okx => (&self.config.okx_symbols, OKX_BOOK_CHANNEL),
                Venue::Bybit => (&self.config.bybit_symbols, BYBIT_BOOK_CHANNEL),
            };
            conn.subscribe(symbols, channel);
            if conn.connect().await {
                info!(target: "system", venue = %conn.venue(), "connection initiated");
            }
        }

        for conn in &self.connections {
            let conn = conn.clone();
            let stop = self.stop.clone();
            self.dispatch_tasks.push(tokio::spawn(async move {
                while !stop.load(Ordering::Acquire) {
                    if conn.poll(|_| {}) == 0 {
                        tokio::time::sleep(IDLE_POLL_INTERVAL).await;
                    }
                }
            }));
        }
    }

    /// Orderly shutdown: stop dispatch, close each connection in
    /// construction order, then the publisher.
    pub async fn shutdown(&mut self) {
        info!(target: "system", "shutting down");
        self.stop.store(true, Ordering::Release);
        for task in self.dispatch_tasks.drain(..) {
            let _ = task.await;
        }
        for conn in &self.connections {
            conn.close().await;
        }
        self.publisher.close();
        info!(target: "system", "shutdown complete");
    }

    pub fn connections(&self) -> &[Arc<VenueConnection<WsClient>>] {
        &self.connections
    }

    pub fn books(&self) -> &Arc<BookManager> {
        &self.books
    }
}
