//! End-to-end analysis pipeline with a TTL cache in front of it.

use super::cache::{AnalysisCache, CacheEntry};
use super::decision::{ChatModelDecisionMaker, DataPackage, DecisionMaker, DisabledDecisionMaker};
use super::fetcher::SeriesFetcher;
use super::fundamentals::FundamentalsFetcher;
use super::indicators;
use super::symbols::{SymbolInfo, SymbolTable};
use crate::config::{AnalysisSettings, Config, ProviderConfig};
use crate::error::AnalysisError;
use crate::sources::{
    http_client, BinanceClient, CandleProvider, CoinGeckoClient, CoinMarketCapClient,
    CoinbaseClient, FundamentalsProvider, ProviderKind,
};
use crate::types::{
    AnalysisResult, Candle, Decision, FundamentalsSnapshot, IndicatorSet, IndicatorSummary,
    Interval,
};
use chrono::Utc;
use dashmap::DashMap;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Timeout for one decision model call.
const MODEL_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome of [`Analyzer::analyze`].
#[derive(Debug, Clone)]
pub struct Analysis {
    pub result: Arc<AnalysisResult>,
    /// Served from the cache rather than computed by this call.
    pub cached: bool,
    /// Time since the result was stored.
    pub age: Duration,
}

/// Uncached candles, indicators and fundamentals for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub interval: Interval,
    pub candles: Vec<Candle>,
    pub indicators: IndicatorSet,
    pub fundamentals: FundamentalsSnapshot,
}

/// Runs analyses and caches them per canonical symbol.
///
/// Concurrent misses for the same symbol are coalesced: the first caller
/// computes while the others wait on a per-symbol lock, then read the cache.
pub struct Analyzer {
    settings: AnalysisSettings,
    symbols: Arc<SymbolTable>,
    series: SeriesFetcher,
    fundamentals: FundamentalsFetcher,
    decision: Arc<dyn DecisionMaker>,
    cache: Arc<AnalysisCache>,
    inflight: DashMap<String, Arc<Mutex<()>>>,
}

impl Analyzer {
    pub fn new(
        settings: AnalysisSettings,
        symbols: Arc<SymbolTable>,
        series: SeriesFetcher,
        fundamentals: FundamentalsFetcher,
        decision: Arc<dyn DecisionMaker>,
        cache: Arc<AnalysisCache>,
    ) -> Self {
        Self {
            settings,
            symbols,
            series,
            fundamentals,
            decision,
            cache,
            inflight: DashMap::new(),
        }
    }

    /// Wire providers, decision maker and cache from configuration.
    pub fn from_config(config: &Config) -> Self {
        let providers = &config.providers;
        let client = http_client(providers.timeout());

        let candle_providers: Vec<Arc<dyn CandleProvider>> = providers
            .price_providers
            .iter()
            .filter_map(|kind| candle_provider(*kind, &client, providers))
            .collect();
        let fundamentals_providers: Vec<Arc<dyn FundamentalsProvider>> = providers
            .fundamentals_providers
            .iter()
            .filter_map(|kind| fundamentals_provider(*kind, &client, providers))
            .collect();

        let decision: Arc<dyn DecisionMaker> = match config.model.api_key {
            Some(ref key) => Arc::new(ChatModelDecisionMaker::new(
                http_client(MODEL_TIMEOUT),
                key.clone(),
                &config.model,
            )),
            None => {
                warn!("OPENAI_API_KEY not set, decisions will be inconclusive");
                Arc::new(DisabledDecisionMaker)
            }
        };

        let series = SeriesFetcher::new(candle_providers, providers.timeout());
        let fundamentals = FundamentalsFetcher::new(fundamentals_providers, providers.timeout());
        info!(
            "Analyzer ready: candles via [{}], fundamentals via [{}], decisions via {}",
            series.provider_names().join(", "),
            fundamentals.provider_names().join(", "),
            decision.name()
        );

        Self::new(
            config.analysis.clone(),
            Arc::new(SymbolTable::default()),
            series,
            fundamentals,
            decision,
            Arc::new(AnalysisCache::new(config.cache_ttl())),
        )
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn cache(&self) -> &Arc<AnalysisCache> {
        &self.cache
    }

    /// Analysis for `symbol`, from cache when fresh.
    pub async fn analyze(&self, symbol: &str) -> Result<Analysis, AnalysisError> {
        let info = self.symbols.resolve(symbol)?;
        let key = info.canonical.clone();

        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let (_slot, lock) = InflightSlot::acquire(&self.inflight, &key);
        let _held = lock.lock().await;
        let outcome = match self.cached(&key) {
            Some(hit) => Ok(hit),
            None => self.compute_and_store(&info).await,
        };
        outcome
    }

    /// Candle series for `symbol`, uncached.
    pub async fn fetch_market_series(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>, AnalysisError> {
        let info = self.symbols.resolve(symbol)?;
        self.series.fetch_series(&info, interval, limit).await
    }

    /// Candles, indicators and fundamentals for `symbol`, uncached.
    pub async fn market_snapshot(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<MarketSnapshot, AnalysisError> {
        let info = self.symbols.resolve(symbol)?;
        let (candles, fundamentals) = tokio::join!(
            self.series.fetch_series(&info, interval, limit),
            self.fundamentals.fetch(&info)
        );
        let candles = candles?;
        let indicators = indicators::compute(&candles)?;

        Ok(MarketSnapshot {
            symbol: info.canonical,
            interval,
            candles,
            indicators,
            fundamentals,
        })
    }

    /// Fresh cached analysis for a canonical symbol.
    pub fn cached(&self, key: &str) -> Option<Analysis> {
        let entry = self.cache.get(key)?;
        debug!("Cache hit for {}", key);
        Some(self.to_analysis(entry))
    }

    fn to_analysis(&self, entry: CacheEntry<Arc<AnalysisResult>>) -> Analysis {
        Analysis {
            age: self.cache.age_of(&entry),
            result: entry.value,
            cached: true,
        }
    }

    async fn compute_and_store(&self, info: &SymbolInfo) -> Result<Analysis, AnalysisError> {
        let started = Instant::now();
        info!("Starting analysis for {}", info.canonical);

        let result = Arc::new(self.run(info).await?);
        self.cache.put(info.canonical.clone(), result.clone());

        info!(
            "Analysis for {} finished in {:?}: {} ({})",
            info.canonical,
            started.elapsed(),
            result.decision.action,
            result.decision.confidence
        );

        Ok(Analysis {
            result,
            cached: false,
            age: Duration::ZERO,
        })
    }

    async fn run(&self, info: &SymbolInfo) -> Result<AnalysisResult, AnalysisError> {
        let settings = &self.settings;
        let (candles, fundamentals) = tokio::join!(
            self.series
                .fetch_series(info, settings.interval, settings.candle_limit),
            self.fundamentals.fetch(info)
        );
        let candles = candles?;
        let indicators = indicators::compute(&candles)?;
        let summary = summarize(&candles, &indicators)?;

        let package = DataPackage::new(&info.canonical, settings, &candles, &indicators, &fundamentals);
        let decision = match self.decision.decide(&package).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!("Decision step failed for {}: {:#}", info.canonical, e);
                Decision::inconclusive(settings.position_size, "Decision step failed")
            }
        };

        Ok(AnalysisResult {
            id: Uuid::new_v4(),
            symbol: info.canonical.clone(),
            interval: settings.interval,
            timestamp: Utc::now(),
            decision,
            summary,
            fundamentals,
            signals: package.recent_signals,
        })
    }
}

/// Registration of one caller in the in-flight map.
///
/// Dropping the slot removes the map entry once no other caller holds its
/// lock, including when the owning future is dropped mid-analysis. The slot
/// must outlive the lock handle returned with it.
struct InflightSlot<'a> {
    map: &'a DashMap<String, Arc<Mutex<()>>>,
    key: &'a str,
}

impl<'a> InflightSlot<'a> {
    fn acquire(map: &'a DashMap<String, Arc<Mutex<()>>>, key: &'a str) -> (Self, Arc<Mutex<()>>) {
        let lock = map
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        (Self { map, key }, lock)
    }
}

impl Drop for InflightSlot<'_> {
    fn drop(&mut self) {
        self.map
            .remove_if(self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Latest values of a computed indicator set.
pub fn summarize(
    candles: &[Candle],
    indicators: &IndicatorSet,
) -> Result<IndicatorSummary, AnalysisError> {
    let last = candles
        .last()
        .ok_or_else(|| AnalysisError::InsufficientData("empty candle series".to_string()))?;
    let stoch = indicators.stoch_rsi.last();

    Ok(IndicatorSummary {
        candles_count: candles.len(),
        last_price: last.close,
        last_candle_at: last.timestamp,
        trend: indicators.trend,
        crossover: indicators.crossover,
        fast_ema: indicators.fast_ema.last().copied(),
        slow_ema: indicators.slow_ema.last().copied(),
        rsi: indicators.rsi.last().copied(),
        stoch_k: stoch.map(|p| p.k),
        stoch_d: stoch.map(|p| p.d),
    })
}

fn candle_provider(
    kind: ProviderKind,
    client: &Client,
    config: &ProviderConfig,
) -> Option<Arc<dyn CandleProvider>> {
    match kind {
        ProviderKind::Binance => Some(Arc::new(BinanceClient::new(
            client.clone(),
            config.binance_base_url.clone(),
            config.binance_api_key.clone(),
        ))),
        ProviderKind::Coinbase => Some(Arc::new(CoinbaseClient::new(
            client.clone(),
            config.coinbase_base_url.clone(),
        ))),
        ProviderKind::CoinGecko => Some(Arc::new(CoinGeckoClient::new(
            client.clone(),
            config.coingecko_base_url.clone(),
            config.coingecko_api_key.clone(),
        ))),
        ProviderKind::CoinMarketCap => {
            warn!("{} does not serve candles, skipping it", kind);
            None
        }
    }
}

fn fundamentals_provider(
    kind: ProviderKind,
    client: &Client,
    config: &ProviderConfig,
) -> Option<Arc<dyn FundamentalsProvider>> {
    match kind {
        ProviderKind::CoinMarketCap => Some(Arc::new(CoinMarketCapClient::new(
            client.clone(),
            config.cmc_base_url.clone(),
            config.cmc_api_key.clone(),
        ))),
        ProviderKind::CoinGecko => Some(Arc::new(CoinGeckoClient::new(
            client.clone(),
            config.coingecko_base_url.clone(),
            config.coingecko_api_key.clone(),
        ))),
        ProviderKind::Binance | ProviderKind::Coinbase => {
            warn!("{} does not serve fundamentals, skipping it", kind);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Trend;
    use chrono::TimeZone;

    #[test]
    fn test_summarize_latest_values() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candles: Vec<Candle> = (0..60)
            .map(|i| {
                let close = 50.0 + i as f64;
                Candle {
                    timestamp: start + chrono::Duration::hours(i),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1.0,
                }
            })
            .collect();
        let set = indicators::compute(&candles).unwrap();
        let summary = summarize(&candles, &set).unwrap();

        assert_eq!(summary.candles_count, 60);
        assert_eq!(summary.last_price, 109.0);
        assert_eq!(summary.last_candle_at, candles[59].timestamp);
        assert_eq!(summary.trend, Some(Trend::Bullish));
        assert_eq!(summary.rsi, Some(100.0));
        assert!(summary.stoch_k.is_some());
    }

    #[test]
    fn test_summarize_empty_series() {
        let set = IndicatorSet {
            fast_ema: vec![],
            slow_ema: vec![],
            rsi: vec![],
            stoch_rsi: vec![],
            trend: None,
            crossover: None,
        };
        assert!(summarize(&[], &set).is_err());
    }

    #[test]
    fn test_provider_wiring_skips_unsupported_roles() {
        let config = ProviderConfig::default();
        let client = Client::new();
        assert!(candle_provider(ProviderKind::CoinMarketCap, &client, &config).is_none());
        assert!(fundamentals_provider(ProviderKind::Binance, &client, &config).is_none());
        let gecko = candle_provider(ProviderKind::CoinGecko, &client, &config).unwrap();
        assert_eq!(gecko.name(), "coingecko");
    }

    #[test]
    fn test_inflight_entry_removed_with_last_slot() {
        let map = DashMap::new();
        let (first, first_lock) = InflightSlot::acquire(&map, "btc");
        let (second, second_lock) = InflightSlot::acquire(&map, "btc");
        assert!(Arc::ptr_eq(&first_lock, &second_lock));
        assert_eq!(map.len(), 1);

        drop(first_lock);
        drop(first);
        assert_eq!(map.len(), 1);
        drop(second_lock);
        drop(second);
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_inflight_entry_removed_when_future_dropped() {
        let map = DashMap::new();

        let holder = async {
            let (_slot, lock) = InflightSlot::acquire(&map, "eth");
            let _held = lock.lock().await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        };
        let outcome = tokio::time::timeout(Duration::from_millis(20), holder).await;

        assert!(outcome.is_err());
        assert!(map.is_empty());
    }
}
