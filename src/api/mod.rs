//! Read-only REST view of an aggregated leaderboard.
//!
//! - `GET /leaderboard` returns the ranked table, optionally cut to `?limit=N`
//! - `GET /leaderboard/{rank}` returns one entry by its 1-based rank

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::leaderboard::RankedTable;

pub use types::{ErrorResponse, LeaderboardQuery, LeaderboardResponse};

/// Immutable state shared by every handler.
///
/// Built once from the aggregated table and wrapped in `Arc`; nothing is
/// mutated after startup, so no locks are needed.
#[derive(Debug)]
pub struct AppState {
    pub table: RankedTable,
}

impl AppState {
    pub fn new(table: RankedTable) -> Self {
        Self { table }
    }
}

/// Builds the router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/leaderboard", get(handlers::get_leaderboard))
        .route("/leaderboard/{rank}", get(handlers::get_entry))
        .with_state(state)
}

/// Binds to `addr` and serves the API until the listener fails.
///
/// # Errors
///
/// Returns the bind or accept error.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
