use super::{require_spelling, send_json, CandleProvider, ProviderKind};
use crate::error::ProviderError;
use crate::services::symbols::SymbolInfo;
use crate::types::Interval;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

pub const BINANCE_API_URL: &str = "https://api.binance.com";

/// Maximum klines returned per request.
pub const MAX_KLINES: usize = 1000;

/// Binance REST client for spot klines.
///
/// Klines come back as `[openTime(ms), open, high, low, close, volume, ...]`
/// with prices encoded as strings, oldest first.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl BinanceClient {
    /// Create a new Binance client.
    pub fn new(client: Client, base_url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| BINANCE_API_URL.to_string()),
            api_key,
        }
    }

    /// Native query for `(interval, limit)`: candle count clamped to the API maximum.
    pub fn klines_query(pair: &str, interval: Interval, limit: usize) -> Vec<(&'static str, String)> {
        vec![
            ("symbol", pair.to_string()),
            ("interval", interval.as_str().to_string()),
            ("limit", limit.clamp(1, MAX_KLINES).to_string()),
        ]
    }
}

#[async_trait]
impl CandleProvider for BinanceClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Binance
    }

    async fn fetch_candles(
        &self,
        symbol: &SymbolInfo,
        interval: Interval,
        limit: usize,
    ) -> Result<serde_json::Value, ProviderError> {
        let pair = require_spelling(ProviderKind::Binance, symbol)?;
        let url = format!("{}/api/v3/klines", self.base_url);
        debug!("Fetching Binance klines: {} {} x{}", pair, interval, limit);

        let mut request = self
            .client
            .get(&url)
            .query(&Self::klines_query(&pair, interval, limit));
        if let Some(ref key) = self.api_key {
            request = request.header("X-MBX-APIKEY", key);
        }

        send_json(ProviderKind::Binance, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_klines_query_passes_interval_and_pair() {
        let query = BinanceClient::klines_query("BTCUSDT", Interval::OneHour, 100);
        assert_eq!(query[0], ("symbol", "BTCUSDT".to_string()));
        assert_eq!(query[1], ("interval", "1h".to_string()));
        assert_eq!(query[2], ("limit", "100".to_string()));
    }

    #[test]
    fn test_klines_query_clamps_limit() {
        let query = BinanceClient::klines_query("ETHUSDT", Interval::OneDay, 5000);
        assert_eq!(query[2].1, "1000");
        let query = BinanceClient::klines_query("ETHUSDT", Interval::OneDay, 0);
        assert_eq!(query[2].1, "1");
    }

    #[test]
    fn test_default_base_url() {
        let client = BinanceClient::new(Client::new(), None, None);
        assert_eq!(client.base_url, BINANCE_API_URL);
        assert_eq!(client.name(), "binance");
    }
}
