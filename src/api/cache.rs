use super::ApiResponse;
use crate::AppState;
use axum::{extract::State, routing::delete, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheClearedResponse {
    pub cleared_items: usize,
    pub timestamp: DateTime<Utc>,
}

/// DELETE /api/cache
async fn clear_cache(State(state): State<AppState>) -> Json<ApiResponse<CacheClearedResponse>> {
    let cleared_items = state.analyzer.cache().clear();
    info!("Cleared analysis cache ({} entries)", cleared_items);

    Json(ApiResponse::new(CacheClearedResponse {
        cleared_items,
        timestamp: Utc::now(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/cache", delete(clear_cache))
}
