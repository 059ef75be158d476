use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Json};
use serde::Serialize;

use super::RouteGroup;
use crate::state::AppState;

pub fn group() -> RouteGroup {
    RouteGroup::new("stats").route("/stats", get(stats_handler))
}

/// Point-in-time view of the process counters.
#[derive(Debug, Serialize)]
pub struct StatsSnapshot {
    pub loans_recorded: u64,
    pub loans_on_book: usize,
    pub requests: BTreeMap<String, u64>,
    pub uptime_seconds: u64,
}

async fn stats_handler(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(StatsSnapshot {
        loans_recorded: state.metrics.loans_recorded_total.get(),
        loans_on_book: state.loans.len().await,
        requests: state.metrics.requests_by_group(),
        uptime_seconds: state.uptime().as_secs(),
    })
}
