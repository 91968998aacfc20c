//! TLS WebSocket client
//!
//! All blocking I/O lives on a dedicated task that owns the socket. The
//! rest of the gateway talks to it through queues: a bounded inbound
//! queue (overflow drops the newest frame) and an unbounded outbound
//! queue drained only while connected. Reconnects are driven by the
//! [`Backoff`] schedule and replay the owner's subscriptions.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{client_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::{Backoff, FrameTransport, ReplayHook};
use crate::adapter::Endpoint;
use crate::config::RetryConfig;
use crate::error::Result;
use crate::metrics;

/// Inbound queue bound; the newest enqueue is dropped on overflow.
pub const INBOUND_QUEUE_CAPACITY: usize = 10_000;

/// A Connected stream with no inbound traffic for this long is logged as
/// stale. It does not trigger a reconnect.
const STALE_AFTER: Duration = Duration::from_secs(60);
const STALE_CHECK_EVERY: Duration = Duration::from_secs(10);

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    WaitingRetry = 3,
}

impl ConnState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnState::Connecting,
            2 => ConnState::Connected,
            3 => ConnState::WaitingRetry,
            _ => ConnState::Disconnected,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ConnState::Disconnected => "disconnected",
            ConnState::Connecting => "connecting",
            ConnState::Connected => "connected",
            ConnState::WaitingRetry => "waiting_retry",
        }
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Shared {
    label: &'static str,
    state: AtomicU8,
    inbound_tx: mpsc::Sender<String>,
    outbound_tx: mpsc::UnboundedSender<String>,
    replay: Mutex<Option<ReplayHook>>,
    shutdown: AtomicBool,
    shutdown_notify: Notify,
    dropped: AtomicU64,
}

impl Shared {
    fn set_state(&self, state: ConnState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn state(&self) -> ConnState {
        ConnState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn push_inbound(&self, frame: String) {
        if self.inbound_tx.try_send(frame).is_err() {
            metrics::frames_dropped()
                .with_label_values(&[self.label])
                .inc();
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if dropped % 1000 == 1 {
                warn!(
                    target: "system",
                    venue = self.label,
                    dropped,
                    "inbound queue full, dropping frame"
                );
            }
        }
    }
}

/// One TLS text-frame connection with background reconnection.
pub struct WsClient {
    endpoint: Endpoint,
    retry: RetryConfig,
    shared: Arc<Shared>,
    inbound_rx: Mutex<mpsc::Receiver<String>>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    io_task: Mutex<Option<JoinHandle<()>>>,
}

impl WsClient {
    pub fn new(endpoint: Endpoint, retry: RetryConfig, label: &'static str) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Self {
            endpoint,
            retry,
            shared: Arc::new(Shared {
                label,
                state: AtomicU8::new(ConnState::Disconnected as u8),
                inbound_tx,
                outbound_tx,
                replay: Mutex::new(None),
                shutdown: AtomicBool::new(false),
                shutdown_notify: Notify::new(),
                dropped: AtomicU64::new(0),
            }),
            inbound_rx: Mutex::new(inbound_rx),
            outbound_rx: Mutex::new(Some(outbound_rx)),
            io_task: Mutex::new(None),
        }
    }

    /// Request to be connected. Spawns the I/O task on first call and
    /// reports that first attempt's outcome; later calls are no-ops and
    /// reconnection runs in the background.
    pub async fn connect(&self) -> bool {
        if self.io_task.lock().is_some() {
            return self.is_connected();
        }
        let Some(outbound_rx) = self.outbound_rx.lock().take() else {
            return self.is_connected();
        };

        let (first_tx, first_rx) = oneshot::channel();
        let task = tokio::spawn(io_loop(
            self.shared.clone(),
            self.endpoint,
            self.retry.clone(),
            outbound_rx,
            first_tx,
        ));
        *self.io_task.lock() = Some(task);

        first_rx.await.unwrap_or(false)
    }

    /// Observable lifecycle state.
    pub fn state(&self) -> ConnState {
        self.shared.state()
    }

    /// Frames dropped on inbound queue overflow.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Graceful shutdown: sends a close frame, cancels any pending retry
    /// timer, and joins the I/O task.
    pub async fn close(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.shutdown_notify.notify_one();

        let task = self.io_task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        self.shared.set_state(ConnState::Disconnected);
        info!(target: "system", venue = self.shared.label, "websocket client closed");
    }
}

impl FrameTransport for WsClient {
    fn send(&self, frame: &str) {
        if !self.is_connected() {
            debug!(
                target: "system",
                venue = self.shared.label,
                "not connected, outbound frame dropped"
            );
            return;
        }
        let _ = self.shared.outbound_tx.send(frame.to_string());
    }

    fn next_message(&self) -> Option<String> {
        self.inbound_rx.lock().try_recv().ok()
    }

    fn is_connected(&self) -> bool {
        self.shared.state() == ConnState::Connected
    }

    fn set_replay_hook(&self, hook: ReplayHook) {
        *self.shared.replay.lock() = Some(hook);
    }
}

async fn io_loop(
    shared: Arc<Shared>,
    endpoint: Endpoint,
    retry: RetryConfig,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    first_tx: oneshot::Sender<bool>,
) {
    let mut backoff = Backoff::new(&retry);
    let mut first_result = Some(first_tx);

    loop {
        if shared.shutting_down() {
            break;
        }
        shared.set_state(ConnState::Connecting);

        match open_stream(&endpoint).await {
            Ok(ws) => {
                backoff.reset();
                shared.set_state(ConnState::Connected);
                info!(
                    target: "system",
                    venue = shared.label,
                    host = endpoint.host,
                    "websocket connected"
                );

                // The first synchronous success is reported to the caller,
                // which sends its own subscriptions; every other successful
                // connect replays them from the hook.
                let replay = match first_result.take() {
                    Some(tx) => {
                        let _ = tx.send(true);
                        Vec::new()
                    }
                    None => shared
                        .replay
                        .lock()
                        .as_ref()
                        .map(|hook| hook())
                        .unwrap_or_default(),
                };

                let exit = drive(ws, &shared, &mut outbound_rx, replay).await;

                // Frames queued for the dead connection are stale; the
                // owner replays what matters.
                while outbound_rx.try_recv().is_ok() {}

                match exit {
                    Exit::Shutdown => break,
                    Exit::Stream(reason) => {
                        warn!(
                            target: "system",
                            venue = shared.label,
                            %reason,
                            "websocket stream lost"
                        );
                    }
                }
            }
            Err(e) => {
                warn!(
                    target: "system",
                    venue = shared.label,
                    error = %e,
                    "websocket connect failed"
                );
                if let Some(tx) = first_result.take() {
                    let _ = tx.send(false);
                }
            }
        }

        if shared.shutting_down() || !retry.enabled {
            break;
        }
        match backoff.next_delay() {
            Some(delay) => {
                shared.set_state(ConnState::WaitingRetry);
                info!(
                    target: "system",
                    venue = shared.label,
                    attempt = backoff.attempt(),
                    delay_ms = delay.as_millis() as u64,
                    "reconnect scheduled"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shared.shutdown_notify.notified() => break,
                }
            }
            None => {
                error!(
                    target: "system",
                    venue = shared.label,
                    "max reconnect attempts reached, giving up"
                );
                break;
            }
        }
    }

    shared.set_state(ConnState::Disconnected);
}

enum Exit {
    Shutdown,
    Stream(String),
}

async fn drive(
    ws: WsStream,
    shared: &Shared,
    outbound_rx: &mut mpsc::UnboundedReceiver<String>,
    replay: Vec<String>,
) -> Exit {
    let (mut write, mut read) = ws.split();

    for frame in replay {
        debug!(target: "system", venue = shared.label, %frame, "replaying subscription");
        if let Err(e) = write.send(Message::Text(frame)).await {
            return Exit::Stream(e.to_string());
        }
    }

    let mut stale_check = tokio::time::interval(STALE_CHECK_EVERY);
    stale_check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last_inbound = Instant::now();
    let mut stale_logged = false;

    loop {
        tokio::select! {
            _ = shared.shutdown_notify.notified() => {
                let _ = write.send(Message::Close(None)).await;
                return Exit::Shutdown;
            }
            frame = outbound_rx.recv() => {
                let Some(frame) = frame else {
                    return Exit::Stream("send queue closed".to_string());
                };
                if let Err(e) = write.send(Message::Text(frame)).await {
                    return Exit::Stream(e.to_string());
                }
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    last_inbound = Instant::now();
                    stale_logged = false;
                    metrics::frames_received()
                        .with_label_values(&[shared.label])
                        .inc();
                    shared.push_inbound(text);
                }
                Some(Ok(Message::Binary(data))) => {
                    last_inbound = Instant::now();
                    stale_logged = false;
                    shared.push_inbound(String::from_utf8_lossy(&data).into_owned());
                }
                Some(Ok(Message::Ping(payload))) => {
                    // RFC 6455 control ping, distinct from the venues'
                    // application-level heartbeats handled upstream.
                    if let Err(e) = write.send(Message::Pong(payload)).await {
                        return Exit::Stream(e.to_string());
                    }
                }
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    return Exit::Stream(format!("close frame received: {:?}", frame));
                }
                Some(Err(e)) => return Exit::Stream(e.to_string()),
                None => return Exit::Stream("stream ended".to_string()),
            },
            _ = stale_check.tick() => {
                if !stale_logged && last_inbound.elapsed() >= STALE_AFTER {
                    warn!(
                        target: "system",
                        venue = shared.label,
                        idle_secs = last_inbound.elapsed().as_secs(),
                        "stream stale, no inbound traffic"
                    );
                    stale_logged = true;
                }
            }
        }
    }
}

async fn open_stream(endpoint: &Endpoint) -> Result<WsStream> {
    let tcp = TcpStream::connect((endpoint.host, endpoint.port)).await?;

    let mut builder = native_tls::TlsConnector::builder();
    builder.min_protocol_version(Some(native_tls::Protocol::Tlsv12));
    if cfg!(debug_assertions) {
        builder.danger_accept_invalid_certs(true);
    }
    let connector = Connector::NativeTls(builder.build()?);

    let (ws, response) =
        client_async_tls_with_config(endpoint.url(), tcp, None, Some(connector)).await?;
    debug!(
        target: "system",
        status = ?response.status(),
        "websocket handshake complete"
    );
    Ok(ws)
}
