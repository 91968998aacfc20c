//! Error types for the gateway

use thiserror::Error;

/// Gateway errors.
///
/// Transport errors are transient and drive the reconnect state machine;
/// protocol errors are logged and the offending frame discarded. No error
/// crosses a component boundary as a panic.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("inbound queue full, frame dropped")]
    Backpressure,

    #[error("max reconnect attempts exceeded")]
    ExhaustedRetries,
}

impl From<tokio_tungstenite::tungstenite::Error> for GatewayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Protocol(err.to_string())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

impl From<native_tls::Error> for GatewayError {
    fn from(err: native_tls::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
