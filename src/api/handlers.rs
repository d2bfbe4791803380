//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::types::{ErrorResponse, LeaderboardQuery, LeaderboardResponse};

fn error(status: StatusCode, message: String) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse { error: message }))
}

/// `GET /leaderboard` → 200 + `LeaderboardResponse`
/// `GET /leaderboard?limit=0` → 400 + `ErrorResponse`
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> impl IntoResponse {
    if query.limit == Some(0) {
        return Err(error(
            StatusCode::BAD_REQUEST,
            "`limit` must be > 0".to_string(),
        ));
    }
    Ok(Json(LeaderboardResponse::from_table(&state.table, query.limit)))
}

/// `GET /leaderboard/{rank}` → 200 + `RankedEntry`, or 404 if no such rank.
pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(rank): Path<usize>,
) -> impl IntoResponse {
    match state.table.get(rank) {
        Some(entry) => Ok(Json(entry.clone())),
        None => Err(error(
            StatusCode::NOT_FOUND,
            format!("no entry at rank {rank} ({} ranked)", state.table.len()),
        )),
    }
}
