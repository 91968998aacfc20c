//! Configuration module for the gateway

use std::env;

use serde::Deserialize;

use crate::error::{GatewayError, Result};

/// Application configuration, loaded once at startup and shared by
/// reference. Nothing mutates it afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// OKX instruments to subscribe to (e.g., ["ETH-USDT-SWAP"])
    pub okx_symbols: Vec<String>,

    /// Bybit instruments to subscribe to (e.g., ["ETHUSDT"])
    pub bybit_symbols: Vec<String>,

    /// Reconnection settings
    pub retry: RetryConfig,

    /// Outbound UDP feed settings
    pub feed: FeedConfig,

    /// Per-sink logging settings
    pub logging: LogConfig,

    /// Verbose per-message trace
    pub debug_log_enabled: bool,
}

/// WebSocket reconnect policy.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub enabled: bool,
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

/// UDP feed target.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub enabled: bool,
    pub address: String,
    pub port: u16,
}

/// Sink gating and file paths for the price/system/trade logs.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub price_enabled: bool,
    pub system_enabled: bool,
    pub trade_enabled: bool,
    pub price_file: String,
    pub system_file: String,
    pub trade_file: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Absent variables fall back to their defaults; present but malformed
    /// values are a fatal configuration error.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            okx_symbols: csv_env("TRADING_SYMBOLS_OKX", DEFAULT_OKX_SYMBOLS),
            bybit_symbols: csv_env("TRADING_SYMBOLS_BYBIT", DEFAULT_BYBIT_SYMBOLS),
            retry: RetryConfig {
                enabled: bool_env("WS_RETRY_ENABLED", true),
                max_attempts: parsed_env("WS_RETRY_MAX_ATTEMPTS", 10)?,
                initial_delay_ms: parsed_env("WS_RETRY_INITIAL_DELAY_MS", 1000)?,
                max_delay_ms: parsed_env("WS_RETRY_MAX_DELAY_MS", 30_000)?,
                backoff_multiplier: parsed_env("WS_RETRY_BACKOFF_MULTIPLIER", 2.0)?,
            },
            feed: FeedConfig {
                enabled: bool_env("UDP_FEED_ENABLED", true),
                address: env::var("UDP_FEED_ADDRESS")
                    .unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: parsed_env("UDP_FEED_PORT", 13_988)?,
            },
            logging: LogConfig {
                price_enabled: bool_env("LOG_PRICE_ENABLED", true),
                system_enabled: bool_env("LOG_SYSTEM_ENABLED", true),
                trade_enabled: bool_env("LOG_TRADE_ENABLED", true),
                price_file: env::var("LOG_PRICE_FILE")
                    .unwrap_or_else(|_| "logs/price.log".to_string()),
                system_file: env::var("LOG_SYSTEM_FILE")
                    .unwrap_or_else(|_| "logs/system.log".to_string()),
                trade_file: env::var("LOG_TRADE_FILE")
                    .unwrap_or_else(|_| "logs/trade.log".to_string()),
            },
            debug_log_enabled: bool_env("DEBUG_LOG_ENABLED", false),
        })
    }
}

const DEFAULT_OKX_SYMBOLS: &[&str] = &[
    "ETH-USDT-SWAP",
    "XRP-USDT-SWAP",
    "SOL-USDT-SWAP",
    "TRX-USDT-SWAP",
    "DOGE-USDT-SWAP",
];

const DEFAULT_BYBIT_SYMBOLS: &[&str] = &[
    "ETHUSDT", "XRPUSDT", "SOLUSDT", "TRXUSDT", "DOGEUSDT",
];

fn csv_env(name: &str, defaults: &[&str]) -> Vec<String> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => defaults.iter().map(|s| s.to_string()).collect(),
    }
}

fn bool_env(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => raw.eq_ignore_ascii_case("true") || raw == "1",
        Err(_) => default,
    }
}

fn parsed_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| {
            GatewayError::Config(format!("invalid value for {}: {:?}", name, raw))
        }),
        Err(_) => Ok(default),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            okx_symbols: DEFAULT_OKX_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            bybit_symbols: DEFAULT_BYBIT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            retry: RetryConfig::default(),
            feed: FeedConfig {
                enabled: true,
                address: "127.0.0.1".to_string(),
                port: 13_988,
            },
            logging: LogConfig {
                price_enabled: true,
                system_enabled: true,
                trade_enabled: true,
                price_file: "logs/price.log".to_string(),
                system_file: "logs/system.log".to_string(),
                trade_file: "logs/trade.log".to_string(),
            },
            debug_log_enabled: false,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 10,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}
