use super::ApiResponse;
use crate::config::AnalysisSettings;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

/// Public view of the running configuration. API keys are never exposed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub analysis: AnalysisSettings,
    pub cache_ttl_secs: u64,
    pub scheduler_interval_secs: u64,
    pub watchlist: Vec<String>,
    pub price_providers: Vec<String>,
    pub fundamentals_providers: Vec<String>,
    pub decision_model_enabled: bool,
}

/// GET /api/config
async fn get_config(State(state): State<AppState>) -> Json<ApiResponse<ConfigResponse>> {
    let config = &state.config;
    Json(ApiResponse::new(ConfigResponse {
        analysis: state.analyzer.settings().clone(),
        cache_ttl_secs: state.analyzer.cache().ttl().as_secs(),
        scheduler_interval_secs: config.scheduler_interval_secs,
        watchlist: config.watchlist.clone(),
        price_providers: config
            .providers
            .price_providers
            .iter()
            .map(|p| p.to_string())
            .collect(),
        fundamentals_providers: config
            .providers
            .fundamentals_providers
            .iter()
            .map(|p| p.to_string())
            .collect(),
        decision_model_enabled: config.model.api_key.is_some(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/config", get(get_config))
}
