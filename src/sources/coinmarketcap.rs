use super::{require_spelling, send_json, FundamentalsProvider, ProviderKind};
use crate::error::{MalformedData, ProviderError};
use crate::services::symbols::SymbolInfo;
use crate::types::FundamentalsSnapshot;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

pub const CMC_API_URL: &str = "https://pro-api.coinmarketcap.com";

#[derive(Debug, Deserialize)]
struct CmcResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct CmcQuoteData {
    circulating_supply: Option<f64>,
    total_supply: Option<f64>,
    quote: HashMap<String, CmcQuote>,
}

#[derive(Debug, Clone, Deserialize)]
struct CmcQuote {
    volume_24h: Option<f64>,
    percent_change_1h: Option<f64>,
    percent_change_24h: Option<f64>,
    percent_change_7d: Option<f64>,
    market_cap: Option<f64>,
}

/// CoinMarketCap REST client for latest quotes.
#[derive(Clone)]
pub struct CoinMarketCapClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinMarketCapClient {
    /// Create a new CoinMarketCap client.
    pub fn new(client: Client, base_url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| CMC_API_URL.to_string()),
            api_key,
        }
    }
}

/// Extract the USD snapshot for `ticker` from a `quotes/latest` response.
pub fn snapshot_from_quotes(
    ticker: &str,
    payload: serde_json::Value,
) -> Result<FundamentalsSnapshot, ProviderError> {
    let response: CmcResponse<HashMap<String, CmcQuoteData>> = serde_json::from_value(payload)
        .map_err(|e| {
            MalformedData::new(
                ProviderKind::CoinMarketCap.as_str(),
                format!("quotes response: {}", e),
            )
        })?;

    let data = response
        .data
        .into_iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(ticker))
        .map(|(_, data)| data)
        .ok_or_else(|| ProviderError::Empty {
            provider: ProviderKind::CoinMarketCap.to_string(),
        })?;

    let usd = data.quote.get("USD").cloned();
    Ok(FundamentalsSnapshot {
        market_cap: usd.as_ref().and_then(|q| q.market_cap),
        volume_24h: usd.as_ref().and_then(|q| q.volume_24h),
        percent_change_1h: usd.as_ref().and_then(|q| q.percent_change_1h),
        percent_change_24h: usd.as_ref().and_then(|q| q.percent_change_24h),
        percent_change_7d: usd.as_ref().and_then(|q| q.percent_change_7d),
        circulating_supply: data.circulating_supply,
        total_supply: data.total_supply,
    })
}

#[async_trait]
impl FundamentalsProvider for CoinMarketCapClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CoinMarketCap
    }

    async fn fetch_fundamentals(
        &self,
        symbol: &SymbolInfo,
    ) -> Result<FundamentalsSnapshot, ProviderError> {
        let Some(ref api_key) = self.api_key else {
            return Err(ProviderError::Unsupported {
                provider: ProviderKind::CoinMarketCap.to_string(),
                reason: "API key not configured".to_string(),
            });
        };

        let ticker = require_spelling(ProviderKind::CoinMarketCap, symbol)?;
        let url = format!("{}/v1/cryptocurrency/quotes/latest", self.base_url);
        debug!("Fetching CoinMarketCap quote for {}", ticker);

        let request = self
            .client
            .get(&url)
            .header("X-CMC_PRO_API_KEY", api_key)
            .query(&[("symbol", ticker.as_str()), ("convert", "USD")]);

        let payload = send_json(ProviderKind::CoinMarketCap, request).await?;
        snapshot_from_quotes(&ticker, payload)
    }
}
