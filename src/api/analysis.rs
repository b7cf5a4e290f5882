use super::{ApiMeta, ApiResponse};
use crate::error::{AppError, Result};
use crate::services::Analysis;
use crate::types::{AnalysisResult, Confidence, DecisionAction};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Latest cached decision for a watchlist symbol.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalSummary {
    pub symbol: String,
    pub decision: DecisionAction,
    pub confidence: Confidence,
    pub entry_price: Option<f64>,
    pub reasons: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub cache_age_ms: u64,
}

impl From<&Analysis> for SignalSummary {
    fn from(analysis: &Analysis) -> Self {
        let result = &analysis.result;
        Self {
            symbol: result.symbol.clone(),
            decision: result.decision.action,
            confidence: result.decision.confidence,
            entry_price: result.decision.entry_price,
            reasons: result.decision.reasons.clone(),
            timestamp: result.timestamp,
            cache_age_ms: analysis.age.as_millis() as u64,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalsResponse {
    pub signals: Vec<SignalSummary>,
    pub count: usize,
    pub generated_at: DateTime<Utc>,
}

fn respond(analysis: Analysis) -> Json<ApiResponse<Arc<AnalysisResult>>> {
    Json(ApiResponse {
        meta: ApiMeta {
            cached: analysis.cached,
            cache_age_ms: Some(analysis.age.as_millis() as u64),
        },
        data: analysis.result,
    })
}

/// GET /api/analysis
async fn get_default_analysis(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Arc<AnalysisResult>>>> {
    let symbol = state.analyzer.settings().default_symbol.clone();
    let analysis = state
        .analyzer
        .analyze(&symbol)
        .await
        .map_err(|e| AppError::analysis(&symbol, e))?;
    Ok(respond(analysis))
}

/// GET /api/analysis/:symbol
async fn get_analysis(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<Arc<AnalysisResult>>>> {
    let analysis = state
        .analyzer
        .analyze(&symbol)
        .await
        .map_err(|e| AppError::analysis(&symbol, e))?;
    Ok(respond(analysis))
}

/// GET /api/signals
///
/// Fresh cached decisions for the watchlist, newest first. Never triggers
/// an analysis.
async fn get_signals(State(state): State<AppState>) -> Json<ApiResponse<SignalsResponse>> {
    let analyzer = &state.analyzer;
    let mut keys: Vec<String> = state
        .config
        .watchlist
        .iter()
        .filter_map(|symbol| analyzer.symbols().canonical(symbol).ok())
        .collect();
    keys.sort();
    keys.dedup();

    let mut signals: Vec<SignalSummary> = keys
        .iter()
        .filter_map(|key| analyzer.cached(key))
        .map(|analysis| SignalSummary::from(&analysis))
        .collect();

    signals.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Json(ApiResponse::new(SignalsResponse {
        count: signals.len(),
        signals,
        generated_at: Utc::now(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/analysis", get(get_default_analysis))
        .route("/api/analysis/:symbol", get(get_analysis))
        .route("/api/signals", get(get_signals))
}
