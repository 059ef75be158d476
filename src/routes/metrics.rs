use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::Registry;

use super::RouteGroup;
use crate::error::ApiError;
use crate::observability::metrics::encode_families;
use crate::state::AppState;

pub fn group() -> RouteGroup {
    RouteGroup::new("metrics").route("/metrics", get(metrics_handler))
}

async fn metrics_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    exposition(state.metrics.registry())
}

/// Renders `registry` as a scrape response. An empty registry gives an empty body.
pub fn exposition(registry: &Registry) -> Result<Response, ApiError> {
    into_exposition(encode_families(&registry.gather()))
}

fn into_exposition(encoded: Result<String, prometheus::Error>) -> Result<Response, ApiError> {
    let body = encoded.map_err(|e| ApiError::Internal(format!("metrics encode failed: {e}")))?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response())
}
