//! Market Data Gateway
//!
//! Connects to OKX and Bybit public WebSocket feeds, maintains local
//! order books, and fans out normalized updates over a local UDP feed.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use tracing::{info, warn};

use market_gateway::config::Config;
use market_gateway::connection::VenueConnection;
use market_gateway::orderbook::BookManager;
use market_gateway::supervisor::Supervisor;
use market_gateway::websocket::WsClient;
use market_gateway::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::load() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("configuration failed: {}", e);
            std::process::exit(2);
        }
    };

    logging::init(&config)?;
    info!(
        target: "system",
        okx = ?config.okx_symbols,
        bybit = ?config.bybit_symbols,
        "starting market data gateway"
    );

    let mut supervisor = Supervisor::new(config.clone())?;

    let health_state = HealthState {
        connections: supervisor.connections().to_vec(),
        books: supervisor.books().clone(),
    };
    tokio::spawn(async move {
        if let Err(e) = serve_health(health_state).await {
            warn!(target: "system", error = %e, "health server error");
        }
    });

    supervisor.start().await;

    shutdown_signal().await;
    info!(target: "system", "shutdown signal received");
    supervisor.shutdown().await;

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[derive(Clone)]
struct HealthState {
    connections: Vec<Arc<VenueConnection<WsClient>>>,
    books: Arc<BookManager>,
}

/// HTTP server for health checks and metrics.
async fn serve_health(state: HealthState) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_text))
        .with_state(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], 9090));
    info!(target: "system", addr = %addr, "starting health check server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check(State(state): State<HealthState>) -> Json<serde_json::Value> {
    let venues: Vec<serde_json::Value> = state
        .connections
        .iter()
        .map(|conn| {
            serde_json::json!({
                "venue": conn.venue().name(),
                "state": conn.state().name(),
                "subscriptions": conn.subscriptions().len(),
            })
        })
        .collect();

    Json(serde_json::json!({
        "status": "healthy",
        "component": "market-gateway",
        "books": state.books.len(),
        "venues": venues,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn metrics_text() -> Result<String, StatusCode> {
    use prometheus::{Encoder, TextEncoder};
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).map_err(|e| {
        warn!(target: "system", error = %e, "metrics encode failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    String::from_utf8(buffer).map_err(|e| {
        warn!(target: "system", error = %e, "metrics output not utf-8");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
