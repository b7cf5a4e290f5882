use super::{require_spelling, send_json, CandleProvider, ProviderKind};
use crate::error::ProviderError;
use crate::services::symbols::SymbolInfo;
use crate::types::Interval;
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::Client;
use tracing::debug;

pub const COINBASE_API_URL: &str = "https://api.exchange.coinbase.com";

/// Maximum candles the exchange returns for one time range.
pub const MAX_CANDLES: usize = 300;

/// Granularities (seconds) accepted by the candles endpoint.
const GRANULARITIES: &[i64] = &[60, 300, 900, 3600, 21600, 86400];

/// Time range covering the last `count` buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandleWindow {
    pub granularity: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Coinbase Exchange client.
///
/// Candles come back newest first as `[time(s), low, high, open, close, volume]`.
#[derive(Clone)]
pub struct CoinbaseClient {
    client: Client,
    base_url: String,
}

impl CoinbaseClient {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| COINBASE_API_URL.to_string()),
        }
    }

    /// Translate `(interval, limit)` into a time range ending at `end`.
    pub fn candle_window(
        interval: Interval,
        limit: usize,
        end: DateTime<Utc>,
    ) -> Result<CandleWindow, ProviderError> {
        let granularity = interval.seconds();
        if !GRANULARITIES.contains(&granularity) {
            return Err(ProviderError::Unsupported {
                provider: ProviderKind::Coinbase.to_string(),
                reason: format!("interval {} not offered", interval),
            });
        }

        let count = limit.clamp(1, MAX_CANDLES) as i64;
        Ok(CandleWindow {
            granularity,
            start: end - Duration::seconds(granularity * count),
            end,
        })
    }
}

#[async_trait]
impl CandleProvider for CoinbaseClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Coinbase
    }

    async fn fetch_candles(
        &self,
        symbol: &SymbolInfo,
        interval: Interval,
        limit: usize,
    ) -> Result<serde_json::Value, ProviderError> {
        let product = require_spelling(ProviderKind::Coinbase, symbol)?;
        let window = Self::candle_window(interval, limit, Utc::now())?;
        let url = format!("{}/products/{}/candles", self.base_url, product);
        debug!(
            "Fetching Coinbase candles: {} granularity={} {} -> {}",
            product, window.granularity, window.start, window.end
        );

        let request = self.client.get(&url).query(&[
            ("granularity", window.granularity.to_string()),
            ("start", window.start.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("end", window.end.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ]);

        send_json(ProviderKind::Coinbase, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_candle_window_hourly() {
        let end = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        let window = CoinbaseClient::candle_window(Interval::OneHour, 100, end).unwrap();
        assert_eq!(window.granularity, 3600);
        assert_eq!(window.end - window.start, Duration::hours(100));
    }

    #[test]
    fn test_candle_window_clamps_count() {
        let end = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        let window = CoinbaseClient::candle_window(Interval::OneMinute, 10_000, end).unwrap();
        assert_eq!(window.end - window.start, Duration::minutes(MAX_CANDLES as i64));
    }

    #[test]
    fn test_candle_window_rejects_unsupported_interval() {
        let end = Utc::now();
        let err = CoinbaseClient::candle_window(Interval::FourHours, 10, end).unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported { .. }));
        assert!(CoinbaseClient::candle_window(Interval::ThirtyMinutes, 10, end).is_err());
    }
}
