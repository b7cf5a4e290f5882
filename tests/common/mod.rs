//! Mock providers and builders shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use augur::config::AnalysisSettings;
use augur::error::ProviderError;
use augur::services::{
    AnalysisCache, Analyzer, DataPackage, DecisionMaker, FundamentalsFetcher, ManualClock,
    SeriesFetcher, SymbolInfo, SymbolTable,
};
use augur::sources::{CandleProvider, FundamentalsProvider, ProviderKind};
use augur::types::{Decision, FundamentalsSnapshot, Interval};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const HOUR_MS: i64 = 3_600_000;
pub const START_MS: i64 = 1_700_000_000_000;

/// What a mock provider does when called.
#[derive(Clone)]
pub enum Behavior {
    Respond(Value),
    Fail,
    /// Respond after a delay.
    Delay(Duration, Value),
}

pub struct MockCandleProvider {
    kind: ProviderKind,
    behavior: Behavior,
    calls: AtomicUsize,
    spellings: Mutex<Vec<String>>,
}

impl MockCandleProvider {
    pub fn new(kind: ProviderKind, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behavior,
            calls: AtomicUsize::new(0),
            spellings: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn spellings(&self) -> Vec<String> {
        self.spellings.lock().unwrap().clone()
    }
}

#[async_trait]
impl CandleProvider for MockCandleProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn fetch_candles(
        &self,
        symbol: &SymbolInfo,
        _interval: Interval,
        _limit: usize,
    ) -> Result<Value, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(spelling) = symbol.spelling(self.kind) {
            self.spellings.lock().unwrap().push(spelling.to_string());
        }
        match &self.behavior {
            Behavior::Respond(payload) => Ok(payload.clone()),
            Behavior::Fail => Err(ProviderError::Status {
                provider: self.kind.to_string(),
                status: 500,
                body: "internal error".to_string(),
            }),
            Behavior::Delay(delay, payload) => {
                tokio::time::sleep(*delay).await;
                Ok(payload.clone())
            }
        }
    }
}

pub struct MockFundamentalsProvider {
    kind: ProviderKind,
    snapshot: Option<FundamentalsSnapshot>,
    calls: AtomicUsize,
    spellings: Mutex<Vec<String>>,
}

impl MockFundamentalsProvider {
    /// `None` makes every call fail.
    pub fn new(kind: ProviderKind, snapshot: Option<FundamentalsSnapshot>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            snapshot,
            calls: AtomicUsize::new(0),
            spellings: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn spellings(&self) -> Vec<String> {
        self.spellings.lock().unwrap().clone()
    }
}

#[async_trait]
impl FundamentalsProvider for MockFundamentalsProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn fetch_fundamentals(
        &self,
        symbol: &SymbolInfo,
    ) -> Result<FundamentalsSnapshot, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(spelling) = symbol.spelling(self.kind) {
            self.spellings.lock().unwrap().push(spelling.to_string());
        }
        self.snapshot.clone().ok_or_else(|| ProviderError::RateLimited {
            provider: self.kind.to_string(),
        })
    }
}

/// Decision maker that parses a canned model reply and counts calls.
pub struct ScriptedDecisionMaker {
    reply: Option<String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedDecisionMaker {
    /// `None` makes every call fail.
    pub fn new(reply: Option<&str>) -> Arc<Self> {
        Self::with_delay(reply, Duration::ZERO)
    }

    pub fn with_delay(reply: Option<&str>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.map(str::to_string),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecisionMaker for ScriptedDecisionMaker {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn decide(&self, package: &DataPackage) -> anyhow::Result<Decision> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.reply {
            Some(text) => Ok(augur::services::parse_decision(text, package.position_size)),
            None => Err(anyhow::anyhow!("model unavailable")),
        }
    }
}

pub const BUY_REPLY: &str = r#"{"decision": "BUY", "confidence": "High", "entry_price": 150.0,
    "stop_loss": 140.0, "take_profit": 170.0, "reasons": ["uptrend"]}"#;

/// Steadily rising closes, Binance kline layout, oldest first.
pub fn binance_payload(count: usize) -> Value {
    let rows: Vec<Value> = (0..count)
        .map(|i| {
            let close = 100.0 + i as f64;
            json!([
                START_MS + i as i64 * HOUR_MS,
                format!("{}", close - 0.5),
                format!("{}", close + 1.0),
                format!("{}", close - 1.0),
                format!("{}", close),
                "12.5",
                START_MS + (i as i64 + 1) * HOUR_MS - 1,
                "0", 10, "0", "0", "0"
            ])
        })
        .collect();
    Value::Array(rows)
}

/// Steadily rising closes, Coinbase layout, newest first.
pub fn coinbase_payload(count: usize) -> Value {
    let rows: Vec<Value> = (0..count)
        .rev()
        .map(|i| {
            let close = 200.0 + i as f64;
            json!([
                START_MS / 1000 + i as i64 * 3600,
                close - 1.0,
                close + 1.0,
                close - 0.5,
                close,
                3.0
            ])
        })
        .collect();
    Value::Array(rows)
}

pub fn some_fundamentals() -> FundamentalsSnapshot {
    FundamentalsSnapshot {
        market_cap: Some(1.0e12),
        volume_24h: Some(3.0e10),
        percent_change_24h: Some(1.5),
        ..FundamentalsSnapshot::unknown()
    }
}

pub struct Harness {
    pub analyzer: Arc<Analyzer>,
    pub clock: Arc<ManualClock>,
}

pub fn analyzer_with(
    candles: Vec<Arc<dyn CandleProvider>>,
    fundamentals: Vec<Arc<dyn FundamentalsProvider>>,
    decision: Arc<dyn DecisionMaker>,
    ttl: Duration,
) -> Harness {
    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(AnalysisCache::with_clock(ttl, clock.clone()));
    let analyzer = Analyzer::new(
        AnalysisSettings::default(),
        Arc::new(SymbolTable::default()),
        SeriesFetcher::new(candles, Duration::from_millis(500)),
        FundamentalsFetcher::new(fundamentals, Duration::from_millis(500)),
        decision,
        cache,
    );
    Harness {
        analyzer: Arc::new(analyzer),
        clock,
    }
}
