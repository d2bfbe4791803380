#![cfg(feature = "api")]

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::util::ServiceExt;

use common::{SEED, reference_dataset, run_policy};
use duel_sim::api::{AppState, router};
use duel_sim::config::ScenarioConfig;
use duel_sim::leaderboard::aggregate;
use duel_sim::policy::{POLICY_IDS, Policy};

fn state() -> Arc<AppState> {
    let dataset = reference_dataset();
    let scenario = ScenarioConfig::baseline();
    let records = POLICY_IDS.iter().map(|id| {
        let policy = Policy::from_id(id, &scenario).expect("known policy");
        run_policy(&dataset, SEED, policy)
            .summary
            .verify()
            .expect("fresh summary verifies")
    });
    Arc::new(AppState::new(aggregate(records)))
}

async fn get(uri: &str) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    let resp = router(state()).oneshot(req).await.expect("router never fails");
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    (status, serde_json::from_slice(&body).expect("body should be JSON"))
}

#[tokio::test]
async fn leaderboard_lists_every_clean_run_in_rank_order() {
    let (status, json) = get("/leaderboard").await;
    assert_eq!(status, StatusCode::OK);

    let entries = json["entries"].as_array().expect("entries array");
    assert_eq!(entries.len(), 3);
    let ranks: Vec<u64> = entries.iter().filter_map(|e| e["rank"].as_u64()).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    let draws: Vec<f64> = entries
        .iter()
        .filter_map(|e| e["record"]["average_grid_draw_kw"].as_f64())
        .collect();
    assert!(draws.windows(2).all(|w| w[0] <= w[1]), "{draws:?}");
    assert_eq!(json["excluded_count"], 0);
}

#[tokio::test]
async fn single_entry_carries_its_integrity_hash() {
    let (status, json) = get("/leaderboard/1").await;
    assert_eq!(status, StatusCode::OK);
    let hash = json["record"]["integrity_hash"].as_str().expect("hash string");
    assert_eq!(hash.len(), 64);
}

#[tokio::test]
async fn out_of_range_rank_is_404() {
    let (status, json) = get("/leaderboard/0").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json.get("error").is_some());
}
