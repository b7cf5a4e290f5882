use super::{require_spelling, send_json, CandleProvider, FundamentalsProvider, ProviderKind};
use crate::error::{MalformedData, ProviderError};
use crate::services::symbols::SymbolInfo;
use crate::types::{FundamentalsSnapshot, Interval};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Day counts accepted by the OHLC endpoint.
const OHLC_DAYS: &[u32] = &[1, 7, 14, 30, 90, 180, 365];
const MAX_OHLC_DAYS: i64 = 365;

/// Entry of the `/coins/markets` response.
#[derive(Debug, Deserialize)]
pub struct CoinGeckoMarket {
    pub id: String,
    pub market_cap: Option<f64>,
    pub total_volume: Option<f64>,
    pub price_change_percentage_1h_in_currency: Option<f64>,
    pub price_change_percentage_24h_in_currency: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_7d_in_currency: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
}

impl From<CoinGeckoMarket> for FundamentalsSnapshot {
    fn from(market: CoinGeckoMarket) -> Self {
        Self {
            market_cap: market.market_cap,
            volume_24h: market.total_volume,
            percent_change_1h: market.price_change_percentage_1h_in_currency,
            percent_change_24h: market
                .price_change_percentage_24h_in_currency
                .or(market.price_change_percentage_24h),
            percent_change_7d: market.price_change_percentage_7d_in_currency,
            circulating_supply: market.circulating_supply,
            total_supply: market.total_supply,
        }
    }
}

/// CoinGecko REST client.
///
/// OHLC rows come back as `[time(ms), open, high, low, close]` without
/// volume, oldest first; the candle granularity is chosen by the API from
/// the requested day count.
#[derive(Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    /// Create a new CoinGecko client.
    pub fn new(client: Client, base_url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| COINGECKO_API_URL.to_string()),
            api_key,
        }
    }

    /// Smallest accepted day count covering `limit` candles of `interval`.
    pub fn ohlc_days(interval: Interval, limit: usize) -> u32 {
        let max_candles = (MAX_OHLC_DAYS * 86_400 / interval.seconds()) as usize;
        let span_secs = interval.seconds() * limit.clamp(1, max_candles) as i64;
        let days = ((span_secs + 86_399) / 86_400) as u32;
        OHLC_DAYS
            .iter()
            .copied()
            .find(|d| *d >= days)
            .unwrap_or(MAX_OHLC_DAYS as u32)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match self.api_key {
            Some(ref key) => request.header("x-cg-demo-api-key", key),
            None => request,
        }
    }
}

/// Pick the snapshot for `coin_id` from a markets response.
pub fn snapshot_from_markets(
    coin_id: &str,
    payload: serde_json::Value,
) -> Result<FundamentalsSnapshot, ProviderError> {
    let markets: Vec<CoinGeckoMarket> = serde_json::from_value(payload).map_err(|e| {
        MalformedData::new(ProviderKind::CoinGecko.as_str(), format!("markets response: {}", e))
    })?;

    markets
        .into_iter()
        .find(|m| m.id == coin_id)
        .map(FundamentalsSnapshot::from)
        .ok_or_else(|| ProviderError::Empty {
            provider: ProviderKind::CoinGecko.to_string(),
        })
}

#[async_trait]
impl CandleProvider for CoinGeckoClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CoinGecko
    }

    async fn fetch_candles(
        &self,
        symbol: &SymbolInfo,
        interval: Interval,
        limit: usize,
    ) -> Result<serde_json::Value, ProviderError> {
        let coin_id = require_spelling(ProviderKind::CoinGecko, symbol)?;
        let days = Self::ohlc_days(interval, limit);
        let url = format!("{}/coins/{}/ohlc", self.base_url, coin_id);
        debug!("Fetching CoinGecko OHLC: {} days for {}", days, coin_id);

        let request = self
            .get(&url)
            .query(&[("vs_currency", "usd".to_string()), ("days", days.to_string())]);

        send_json(ProviderKind::CoinGecko, request).await
    }
}

#[async_trait]
impl FundamentalsProvider for CoinGeckoClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CoinGecko
    }

    async fn fetch_fundamentals(
        &self,
        symbol: &SymbolInfo,
    ) -> Result<FundamentalsSnapshot, ProviderError> {
        let coin_id = require_spelling(ProviderKind::CoinGecko, symbol)?;
        let url = format!("{}/coins/markets", self.base_url);
        debug!("Fetching CoinGecko market data for {}", coin_id);

        let request = self.get(&url).query(&[
            ("vs_currency", "usd"),
            ("ids", coin_id.as_str()),
            ("price_change_percentage", "1h,24h,7d"),
        ]);

        let payload = send_json(ProviderKind::CoinGecko, request).await?;
        snapshot_from_markets(&coin_id, payload)
    }
}
