//! Ordered fallback over candle providers.

use super::normalizer::normalize;
use super::symbols::SymbolInfo;
use crate::error::{AnalysisError, ProviderError};
use crate::sources::CandleProvider;
use crate::types::{Candle, Interval};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Fetches a candle series from the first provider that can serve it.
///
/// Providers are tried strictly in order, one at a time. The first call that
/// answers within the timeout with a valid, non-empty series wins and later
/// providers are never called.
pub struct SeriesFetcher {
    providers: Vec<Arc<dyn CandleProvider>>,
    timeout: Duration,
}

impl SeriesFetcher {
    pub fn new(providers: Vec<Arc<dyn CandleProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Fetch the trailing `limit` candles of `symbol` at `interval`.
    pub async fn fetch_series(
        &self,
        symbol: &SymbolInfo,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>, AnalysisError> {
        let limit = limit.max(1);
        let mut last_error = ProviderError::NotConfigured;

        for provider in &self.providers {
            match self.try_provider(provider.as_ref(), symbol, interval, limit).await {
                Ok(candles) => {
                    info!(
                        "Fetched {} {} candles for {} from {}",
                        candles.len(),
                        interval,
                        symbol.canonical,
                        provider.name()
                    );
                    return Ok(candles);
                }
                Err(e) => {
                    warn!(
                        "Provider {} failed for {}: {}",
                        provider.name(),
                        symbol.canonical,
                        e
                    );
                    last_error = e;
                }
            }
        }

        Err(AnalysisError::DataUnavailable {
            symbol: symbol.canonical.clone(),
            source: Box::new(last_error),
        })
    }

    async fn try_provider(
        &self,
        provider: &dyn CandleProvider,
        symbol: &SymbolInfo,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>, ProviderError> {
        debug!("Requesting {} {} x{} from {}", symbol.canonical, interval, limit, provider.name());

        let raw = timeout(self.timeout, provider.fetch_candles(symbol, interval, limit))
            .await
            .map_err(|_| ProviderError::Timeout {
                provider: provider.name().to_string(),
                after: self.timeout,
            })??;

        let mut candles = normalize(provider.kind(), &raw)?;
        if candles.is_empty() {
            return Err(ProviderError::Empty {
                provider: provider.name().to_string(),
            });
        }

        if candles.len() > limit {
            candles.drain(..candles.len() - limit);
        }
        Ok(candles)
    }
}
