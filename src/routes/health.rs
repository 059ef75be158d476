use axum::{extract::State, http::StatusCode, routing::get, Json};
use serde_json::{json, Value};

use super::RouteGroup;
use crate::state::AppState;

pub fn group() -> RouteGroup {
    RouteGroup::new("health")
        .route("/health", get(health_handler))
        .route("/readyz", get(ready_handler))
        .route("/_build", get(build_handler))
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn ready_handler(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "DRAINING")
    } else if state.is_ready() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT_READY")
    }
}

async fn build_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": state.config.app_name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
