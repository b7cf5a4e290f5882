use super::{Crossover, FundamentalsSnapshot, Interval, Trend};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Action recommended by the decision step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionAction {
    Buy,
    Sell,
    Wait,
}

impl fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionAction::Buy => write!(f, "BUY"),
            DecisionAction::Sell => write!(f, "SELL"),
            DecisionAction::Wait => write!(f, "WAIT"),
        }
    }
}

/// Confidence attached to a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => write!(f, "High"),
            Confidence::Medium => write!(f, "Medium"),
            Confidence::Low => write!(f, "Low"),
        }
    }
}

/// Optional qualitative breakdown returned with a decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionDetails {
    #[serde(default)]
    pub trend_strength: Option<String>,
    #[serde(default)]
    pub volume_confirmation: Option<bool>,
    #[serde(default)]
    pub support_resistance: Option<String>,
    #[serde(default)]
    pub market_sentiment: Option<String>,
}

/// Structured decision record produced by the decision step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(rename = "decision")]
    pub action: DecisionAction,
    pub confidence: Confidence,
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
    #[serde(default)]
    pub risk_reward_ratio: Option<f64>,
    #[serde(default)]
    pub position_size: Option<f64>,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, rename = "analysis", skip_serializing_if = "Option::is_none")]
    pub details: Option<DecisionDetails>,
}

impl Decision {
    /// The fixed fallback used whenever no well-formed decision is available.
    pub fn inconclusive(position_size: f64, reason: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Wait,
            confidence: Confidence::Low,
            entry_price: None,
            stop_loss: None,
            take_profit: None,
            risk_reward_ratio: None,
            position_size: Some(position_size),
            reasons: vec![reason.into()],
            warnings: vec!["Re-run the analysis before acting on it".to_string()],
            details: None,
        }
    }
}

/// Kind of a generated trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Buy,
    Sell,
}

/// Signal derived from the latest crossover event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentSignal {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: SignalKind,
    pub price: f64,
    pub strength: Confidence,
    pub reason: String,
}

/// Latest indicator values for an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSummary {
    pub candles_count: usize,
    pub last_price: f64,
    pub last_candle_at: DateTime<Utc>,
    pub trend: Option<Trend>,
    pub crossover: Option<Crossover>,
    pub fast_ema: Option<f64>,
    pub slow_ema: Option<f64>,
    pub rsi: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
}

/// Externally visible result of one end-to-end analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub symbol: String,
    pub interval: Interval,
    pub timestamp: DateTime<Utc>,
    pub decision: Decision,
    pub summary: IndicatorSummary,
    pub fundamentals: FundamentalsSnapshot,
    pub signals: Vec<RecentSignal>,
}
