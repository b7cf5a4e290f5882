//! Integration tests for the provider fallback chains

mod common;

use augur::error::{AnalysisError, ProviderError};
use augur::services::{FundamentalsFetcher, SeriesFetcher, SymbolTable};
use augur::sources::{CandleProvider, FundamentalsProvider, ProviderKind};
use augur::types::{FundamentalsSnapshot, Interval};
use common::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const TIMEOUT: Duration = Duration::from_millis(100);

fn btc() -> augur::services::SymbolInfo {
    SymbolTable::default().resolve("BTCUSDT").unwrap()
}

fn fetcher(providers: &[Arc<MockCandleProvider>]) -> SeriesFetcher {
    let providers: Vec<Arc<dyn CandleProvider>> = providers
        .iter()
        .map(|p| p.clone() as Arc<dyn CandleProvider>)
        .collect();
    SeriesFetcher::new(providers, TIMEOUT)
}

#[tokio::test]
async fn test_first_success_wins_and_later_providers_untouched() {
    let a = MockCandleProvider::new(ProviderKind::Binance, Behavior::Fail);
    let b = MockCandleProvider::new(ProviderKind::Coinbase, Behavior::Respond(coinbase_payload(30)));
    let c = MockCandleProvider::new(ProviderKind::Binance, Behavior::Respond(binance_payload(30)));

    let candles = assert_ok!(fetcher(&[a.clone(), b.clone(), c.clone()])
        .fetch_series(&btc(), Interval::OneHour, 100)
        .await);

    assert_eq!(candles.len(), 30);
    // Coinbase closes start at 200
    assert_eq!(candles[0].close, 200.0);
    assert!(candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    assert_eq!((a.calls(), b.calls(), c.calls()), (1, 1, 0));
}

#[tokio::test]
async fn test_each_provider_gets_its_own_spelling() {
    let a = MockCandleProvider::new(ProviderKind::Binance, Behavior::Fail);
    let b = MockCandleProvider::new(ProviderKind::Coinbase, Behavior::Respond(coinbase_payload(5)));

    assert_ok!(fetcher(&[a.clone(), b.clone()])
        .fetch_series(&btc(), Interval::OneHour, 5)
        .await);

    assert_eq!(a.spellings(), vec!["BTCUSDT"]);
    assert_eq!(b.spellings(), vec!["BTC-USD"]);
}

#[tokio::test]
async fn test_all_providers_fail() {
    let a = MockCandleProvider::new(ProviderKind::Binance, Behavior::Fail);
    let b = MockCandleProvider::new(ProviderKind::Coinbase, Behavior::Fail);

    let err = assert_err!(fetcher(&[a.clone(), b.clone()])
        .fetch_series(&btc(), Interval::OneHour, 50)
        .await);

    match err {
        AnalysisError::DataUnavailable { symbol, source } => {
            assert_eq!(symbol, "btc");
            assert!(matches!(*source, ProviderError::Status { status: 500, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!((a.calls(), b.calls()), (1, 1));
}

#[tokio::test]
async fn test_no_providers_configured() {
    let err = fetcher(&[])
        .fetch_series(&btc(), Interval::OneHour, 50)
        .await
        .unwrap_err();

    match err {
        AnalysisError::DataUnavailable { source, .. } => {
            assert!(matches!(*source, ProviderError::NotConfigured))
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_counts_as_failure() {
    let slow = MockCandleProvider::new(
        ProviderKind::Binance,
        Behavior::Delay(Duration::from_secs(5), binance_payload(10)),
    );
    let fallback = MockCandleProvider::new(ProviderKind::Coinbase, Behavior::Respond(coinbase_payload(10)));

    let started = std::time::Instant::now();
    let candles = fetcher(&[slow.clone(), fallback.clone()])
        .fetch_series(&btc(), Interval::OneHour, 10)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(candles[0].close, 200.0);
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn test_timeout_error_reported_when_last() {
    let slow = MockCandleProvider::new(
        ProviderKind::Binance,
        Behavior::Delay(Duration::from_secs(5), binance_payload(10)),
    );

    let err = fetcher(&[slow]).fetch_series(&btc(), Interval::OneHour, 10).await.unwrap_err();
    match err {
        AnalysisError::DataUnavailable { source, .. } => {
            assert!(matches!(*source, ProviderError::Timeout { .. }))
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_payload_falls_through() {
    let bad = MockCandleProvider::new(
        ProviderKind::Binance,
        Behavior::Respond(json!([[1700000000000i64, "1.0", "0.5", "2.0", "1.0", "1.0"]])),
    );
    let good = MockCandleProvider::new(ProviderKind::Binance, Behavior::Respond(binance_payload(8)));

    let candles = assert_ok!(fetcher(&[bad.clone(), good.clone()])
        .fetch_series(&btc(), Interval::OneHour, 8)
        .await);
    assert_eq!(candles.len(), 8);
    assert_eq!(good.calls(), 1);
}

#[tokio::test]
async fn test_malformed_only_provider_surfaces_reason() {
    let bad = MockCandleProvider::new(
        ProviderKind::Binance,
        Behavior::Respond(json!({"code": -1121, "msg": "Invalid symbol."})),
    );

    let err = fetcher(&[bad]).fetch_series(&btc(), Interval::OneHour, 8).await.unwrap_err();
    match err {
        AnalysisError::DataUnavailable { source, .. } => {
            assert!(matches!(*source, ProviderError::Malformed(_)))
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_series_falls_through() {
    let empty = MockCandleProvider::new(ProviderKind::Binance, Behavior::Respond(json!([])));
    let good = MockCandleProvider::new(ProviderKind::Coinbase, Behavior::Respond(coinbase_payload(3)));

    let candles = fetcher(&[empty.clone(), good])
        .fetch_series(&btc(), Interval::OneHour, 3)
        .await
        .unwrap();
    assert_eq!(candles.len(), 3);
    assert_eq!(empty.calls(), 1);
}

#[tokio::test]
async fn test_series_trimmed_to_most_recent() {
    let provider = MockCandleProvider::new(ProviderKind::Binance, Behavior::Respond(binance_payload(40)));

    let candles = fetcher(&[provider])
        .fetch_series(&btc(), Interval::OneHour, 10)
        .await
        .unwrap();

    assert_eq!(candles.len(), 10);
    assert_eq!(candles.first().unwrap().close, 130.0);
    assert_eq!(candles.last().unwrap().close, 139.0);
}

fn fundamentals_fetcher(providers: &[Arc<MockFundamentalsProvider>]) -> FundamentalsFetcher {
    let providers: Vec<Arc<dyn FundamentalsProvider>> = providers
        .iter()
        .map(|p| p.clone() as Arc<dyn FundamentalsProvider>)
        .collect();
    FundamentalsFetcher::new(providers, TIMEOUT)
}

#[tokio::test]
async fn test_fundamentals_first_with_data_wins() {
    let empty = MockFundamentalsProvider::new(
        ProviderKind::CoinMarketCap,
        Some(FundamentalsSnapshot::unknown()),
    );
    let gecko = MockFundamentalsProvider::new(ProviderKind::CoinGecko, Some(some_fundamentals()));

    let snapshot = fundamentals_fetcher(&[empty.clone(), gecko.clone()]).fetch(&btc()).await;

    assert_eq!(snapshot, some_fundamentals());
    assert_eq!((empty.calls(), gecko.calls()), (1, 1));
    assert_eq!(gecko.spellings(), vec!["bitcoin"]);
}

#[tokio::test]
async fn test_fundamentals_failure_is_unknown_not_error() {
    let failing = MockFundamentalsProvider::new(ProviderKind::CoinMarketCap, None);

    let snapshot = fundamentals_fetcher(&[failing.clone()]).fetch(&btc()).await;

    assert!(snapshot.is_unknown());
    assert_eq!(failing.calls(), 1);
    assert!(fundamentals_fetcher(&[]).fetch(&btc()).await.is_unknown());
}
