use super::ApiResponse;
use crate::error::{AppError, Result};
use crate::types::{Candle, Crossover, FundamentalsSnapshot, Interval, StochRsiPoint, Trend};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Candles fetched when no limit is given.
const DEFAULT_LIMIT: usize = 50;
/// Candles returned in the response.
const RESPONSE_CANDLES: usize = 20;
/// Trailing indicator values returned in the response.
const RESPONSE_INDICATOR_VALUES: usize = 5;

#[derive(Debug, Deserialize)]
pub struct MarketDataQuery {
    pub interval: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorTail {
    pub trend: Option<Trend>,
    pub crossover: Option<Crossover>,
    pub rsi: Vec<f64>,
    pub fast_ema: Vec<f64>,
    pub slow_ema: Vec<f64>,
    pub stoch_rsi: Vec<StochRsiPoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDataResponse {
    pub symbol: String,
    pub interval: Interval,
    pub timestamp: DateTime<Utc>,
    pub candles: Vec<Candle>,
    pub indicators: IndicatorTail,
    pub fundamentals: FundamentalsSnapshot,
}

fn last<T: Clone>(values: &[T], n: usize) -> Vec<T> {
    values[values.len().saturating_sub(n)..].to_vec()
}

/// GET /api/market-data/:symbol?interval=1h&limit=50
async fn get_market_data(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<MarketDataQuery>,
) -> Result<Json<ApiResponse<MarketDataResponse>>> {
    let interval = match query.interval.as_deref() {
        Some(raw) => Interval::parse(raw)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown interval: {}", raw)))?,
        None => state.analyzer.settings().interval,
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 {
        return Err(AppError::BadRequest("limit must be positive".to_string()));
    }

    let snapshot = state
        .analyzer
        .market_snapshot(&symbol, interval, limit)
        .await
        .map_err(|e| AppError::analysis(&symbol, e))?;

    let indicators = &snapshot.indicators;
    Ok(Json(ApiResponse::new(MarketDataResponse {
        symbol: snapshot.symbol.clone(),
        interval,
        timestamp: Utc::now(),
        candles: last(&snapshot.candles, RESPONSE_CANDLES),
        indicators: IndicatorTail {
            trend: indicators.trend,
            crossover: indicators.crossover,
            rsi: last(&indicators.rsi, RESPONSE_INDICATOR_VALUES),
            fast_ema: last(&indicators.fast_ema, RESPONSE_INDICATOR_VALUES),
            slow_ema: last(&indicators.slow_ema, RESPONSE_INDICATOR_VALUES),
            stoch_rsi: last(&indicators.stoch_rsi, RESPONSE_INDICATOR_VALUES),
        },
        fundamentals: snapshot.fundamentals,
    })))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/market-data/:symbol", get(get_market_data))
}
