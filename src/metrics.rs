//! Prometheus counters for the gateway hot paths.

use std::sync::OnceLock;

use prometheus::{IntCounterVec, Opts};

fn counter_vec(name: &str, help: &str) -> IntCounterVec {
    let counter =
        IntCounterVec::new(Opts::new(name, help), &["venue"]).expect("valid metric opts");
    let _ = prometheus::register(Box::new(counter.clone()));
    counter
}

/// WebSocket text frames received, per venue.
pub fn frames_received() -> &'static IntCounterVec {
    static METRIC: OnceLock<IntCounterVec> = OnceLock::new();
    METRIC.get_or_init(|| {
        counter_vec("gateway_ws_frames_total", "WebSocket frames received")
    })
}

/// Inbound frames dropped because the queue was full.
pub fn frames_dropped() -> &'static IntCounterVec {
    static METRIC: OnceLock<IntCounterVec> = OnceLock::new();
    METRIC.get_or_init(|| {
        counter_vec(
            "gateway_ws_frames_dropped_total",
            "Inbound frames dropped on queue overflow",
        )
    })
}

/// Feed datagrams handed to the kernel.
pub fn datagrams_sent() -> &'static IntCounterVec {
    static METRIC: OnceLock<IntCounterVec> = OnceLock::new();
    METRIC.get_or_init(|| {
        counter_vec("gateway_feed_datagrams_total", "UDP feed datagrams sent")
    })
}

/// Feed datagrams dropped on would-block or send failure.
pub fn datagrams_dropped() -> &'static IntCounterVec {
    static METRIC: OnceLock<IntCounterVec> = OnceLock::new();
    METRIC.get_or_init(|| {
        counter_vec(
            "gateway_feed_datagrams_dropped_total",
            "UDP feed datagrams dropped",
        )
    })
}
