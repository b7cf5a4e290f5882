//! Market data providers.
//!
//! Each client knows its own endpoint, authentication and native query
//! parameters. Candle providers hand back the raw JSON payload; turning it
//! into canonical candles is the normalizer's job.

pub mod binance;
pub mod coinbase;
pub mod coingecko;
pub mod coinmarketcap;

pub use binance::BinanceClient;
pub use coinbase::CoinbaseClient;
pub use coingecko::CoinGeckoClient;
pub use coinmarketcap::CoinMarketCapClient;

use crate::error::ProviderError;
use crate::services::symbols::SymbolInfo;
use crate::types::{FundamentalsSnapshot, Interval};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Binance,
    Coinbase,
    CoinGecko,
    CoinMarketCap,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Binance => "binance",
            ProviderKind::Coinbase => "coinbase",
            ProviderKind::CoinGecko => "coingecko",
            ProviderKind::CoinMarketCap => "coinmarketcap",
        }
    }

    /// Parse a provider name as used in configuration.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "binance" => Some(ProviderKind::Binance),
            "coinbase" => Some(ProviderKind::Coinbase),
            "coingecko" => Some(ProviderKind::CoinGecko),
            "coinmarketcap" | "cmc" => Some(ProviderKind::CoinMarketCap),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source of OHLCV candle series.
#[async_trait]
pub trait CandleProvider: Send + Sync {
    /// Which payload layout this provider returns.
    fn kind(&self) -> ProviderKind;

    /// Name used in logs and errors.
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// Fetch the raw candle payload, translating `(interval, limit)` into the
    /// provider's native query.
    async fn fetch_candles(
        &self,
        symbol: &SymbolInfo,
        interval: Interval,
        limit: usize,
    ) -> Result<serde_json::Value, ProviderError>;
}

/// A source of non-price market attributes.
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn name(&self) -> &str {
        self.kind().as_str()
    }

    async fn fetch_fundamentals(
        &self,
        symbol: &SymbolInfo,
    ) -> Result<FundamentalsSnapshot, ProviderError>;
}

/// Build the shared HTTP client used by provider clients.
pub fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent("Augur/1.0 (market analysis)")
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Send a request and decode its JSON body, mapping HTTP failures to
/// provider errors.
pub(crate) async fn send_json(
    provider: ProviderKind,
    request: RequestBuilder,
) -> Result<serde_json::Value, ProviderError> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
        return Err(ProviderError::RateLimited {
            provider: provider.to_string(),
        });
    }

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            provider: provider.to_string(),
            status: status.as_u16(),
            body: text.chars().take(200).collect(),
        });
    }

    Ok(response.json().await?)
}

/// Spelling for a provider or an `Unsupported` error when it has none.
pub(crate) fn require_spelling(
    provider: ProviderKind,
    symbol: &SymbolInfo,
) -> Result<String, ProviderError> {
    symbol
        .spelling(provider)
        .map(str::to_string)
        .ok_or_else(|| ProviderError::Unsupported {
            provider: provider.to_string(),
            reason: format!("no {} mapping for {}", provider, symbol.canonical),
        })
}
