pub mod catalog;
pub mod config;
pub mod discovery;
pub mod endpoint;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod sse;
pub mod state;
pub mod stream;
pub mod upstream;

use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;

pub fn build_state() -> Result<state::AppState, std::io::Error> {
    let config = config::RelayConfig::from_env();
    info!(
        backend = ?config.backend,
        host = %config.api_host,
        "relay configured"
    );
    state::AppState::new(config).map_err(std::io::Error::other)
}

pub fn build_app(state: state::AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics))
        .route("/api/models", post(handlers::models))
        .route("/api/chat", post(handlers::chat))
        .with_state(state)
}
