use std::sync::Arc;

use axum::{extract::State, response::Json};

use crate::{
    monitoring::{Stats, collect_stats},
    server::AppState,
};

/// GET /v1/stats
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<Stats> {
    tracing::debug!("GET /v1/stats");
    Json(collect_stats(&state))
}
