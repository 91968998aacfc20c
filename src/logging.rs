//! Logging setup
//!
//! Structured events carry one of three targets mirroring the gateway's
//! sinks: `system` (lifecycle, transitions, retries), `price` (per-update
//! diagnostics), `trade` (order lifecycle, unused by the market-data core).
//! Each sink can be routed to its own file in addition to the JSON stdout
//! stream.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::{filter, fmt, prelude::*, EnvFilter, Layer, Registry};

use crate::config::Config;
use crate::error::{GatewayError, Result};

/// Target for lifecycle and connection events.
pub const SYSTEM: &str = "system";
/// Target for per-update market data diagnostics.
pub const PRICE: &str = "price";
/// Target reserved for order lifecycle events.
pub const TRADE: &str = "trade";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber: JSON stdout plus one file layer per
/// enabled sink.
pub fn init(config: &Config) -> Result<()> {
    let level = if config.debug_log_enabled {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let stdout = fmt::layer()
        .json()
        .with_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .boxed();

    let mut layers: Vec<BoxedLayer> = vec![stdout];
    let sinks = &config.logging;
    for (enabled, path, target) in [
        (sinks.price_enabled, &sinks.price_file, PRICE),
        (sinks.system_enabled, &sinks.system_file, SYSTEM),
        (sinks.trade_enabled, &sinks.trade_file, TRADE),
    ] {
        if let Some(layer) = sink_layer(enabled, path, target, level)? {
            layers.push(layer);
        }
    }

    tracing_subscriber::registry().with(layers).init();
    Ok(())
}

fn sink_layer(
    enabled: bool,
    path: &str,
    target: &'static str,
    level: Level,
) -> Result<Option<BoxedLayer>> {
    if !enabled {
        return Ok(None);
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                GatewayError::Config(format!("cannot create log directory for {}: {}", path, e))
            })?;
        }
    }

    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| GatewayError::Config(format!("cannot open log file {}: {}", path, e)))?;

    let layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .with_filter(filter::filter_fn(move |meta| {
            meta.target() == target && *meta.level() <= level
        }))
        .boxed();

    Ok(Some(layer))
}
