//! Ordered fallback over fundamentals providers.
//!
//! Fundamentals are optional context: when every provider fails the
//! analysis carries on with an all-absent snapshot.

use super::symbols::SymbolInfo;
use crate::error::ProviderError;
use crate::sources::FundamentalsProvider;
use crate::types::FundamentalsSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

pub struct FundamentalsFetcher {
    providers: Vec<Arc<dyn FundamentalsProvider>>,
    timeout: Duration,
}

impl FundamentalsFetcher {
    pub fn new(providers: Vec<Arc<dyn FundamentalsProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Snapshot from the first provider with any data; never fails.
    pub async fn fetch(&self, symbol: &SymbolInfo) -> FundamentalsSnapshot {
        for provider in &self.providers {
            match self.try_provider(provider.as_ref(), symbol).await {
                Ok(snapshot) => {
                    debug!("Fundamentals for {} from {}", symbol.canonical, provider.name());
                    return snapshot;
                }
                Err(e) => warn!(
                    "Fundamentals provider {} failed for {}: {}",
                    provider.name(),
                    symbol.canonical,
                    e
                ),
            }
        }

        warn!(
            "No fundamentals available for {}, continuing without them",
            symbol.canonical
        );
        FundamentalsSnapshot::unknown()
    }

    async fn try_provider(
        &self,
        provider: &dyn FundamentalsProvider,
        symbol: &SymbolInfo,
    ) -> Result<FundamentalsSnapshot, ProviderError> {
        let snapshot = timeout(self.timeout, provider.fetch_fundamentals(symbol))
            .await
            .map_err(|_| ProviderError::Timeout {
                provider: provider.name().to_string(),
                after: self.timeout,
            })??;

        if snapshot.is_unknown() {
            return Err(ProviderError::Empty {
                provider: provider.name().to_string(),
            });
        }
        Ok(snapshot)
    }
}
