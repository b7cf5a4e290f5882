//! Decision step: package the analysis inputs, ask a chat model for a
//! recommendation and parse its answer strictly.

use crate::config::{AnalysisSettings, ModelConfig, RiskTolerance};
use crate::types::{
    Candle, Confidence, Crossover, Decision, FundamentalsSnapshot, IndicatorSet, Interval,
    RecentSignal, SignalKind, StochRsiPoint, Trend,
};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

/// Candles handed to the decision step.
pub const PACKAGE_CANDLES: usize = 50;
/// Trailing values of each indicator handed to the decision step.
pub const PACKAGE_INDICATOR_TAIL: usize = 20;
/// Balance assumed when no portfolio is connected.
pub const AVAILABLE_BALANCE: f64 = 10_000.0;

const SYSTEM_PROMPT: &str = "You are an expert in technical analysis and cryptocurrency trading. \
You analyze market data and give structured recommendations.";

#[derive(Debug, Clone, Serialize)]
pub struct OhlcvData {
    pub candles: Vec<Candle>,
    pub total_candles: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorTail {
    pub fast_ema: Vec<f64>,
    pub slow_ema: Vec<f64>,
    pub rsi: Vec<f64>,
    pub stoch_rsi: Vec<StochRsiPoint>,
    pub trend: Option<Trend>,
    pub crossover: Option<Crossover>,
}

/// Passthrough portfolio context. No positions are tracked.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioContext {
    pub current_position: String,
    pub available_balance: f64,
    pub max_risk_per_trade: f64,
    pub leverage_multiplier: f64,
}

/// Everything the decision step sees about one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct DataPackage {
    pub symbol: String,
    pub interval: Interval,
    pub leverage: f64,
    pub position_size: f64,
    pub risk_tolerance: RiskTolerance,
    pub timestamp: DateTime<Utc>,
    pub ohlcv_data: OhlcvData,
    pub technical_indicators: IndicatorTail,
    pub market_context: FundamentalsSnapshot,
    pub recent_signals: Vec<RecentSignal>,
    pub portfolio_context: PortfolioContext,
}

impl DataPackage {
    pub fn new(
        symbol: &str,
        settings: &AnalysisSettings,
        candles: &[Candle],
        indicators: &IndicatorSet,
        fundamentals: &FundamentalsSnapshot,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            interval: settings.interval,
            leverage: settings.leverage,
            position_size: settings.position_size,
            risk_tolerance: settings.risk_tolerance,
            timestamp: Utc::now(),
            ohlcv_data: OhlcvData {
                candles: tail(candles, PACKAGE_CANDLES),
                total_candles: candles.len(),
            },
            technical_indicators: IndicatorTail {
                fast_ema: tail(&indicators.fast_ema, PACKAGE_INDICATOR_TAIL),
                slow_ema: tail(&indicators.slow_ema, PACKAGE_INDICATOR_TAIL),
                rsi: tail(&indicators.rsi, PACKAGE_INDICATOR_TAIL),
                stoch_rsi: tail(&indicators.stoch_rsi, PACKAGE_INDICATOR_TAIL),
                trend: indicators.trend,
                crossover: indicators.crossover,
            },
            market_context: fundamentals.clone(),
            recent_signals: recent_signals(candles, indicators),
            portfolio_context: PortfolioContext {
                current_position: "none".to_string(),
                available_balance: AVAILABLE_BALANCE,
                max_risk_per_trade: settings.position_size * 0.1,
                leverage_multiplier: settings.leverage,
            },
        }
    }
}

fn tail<T: Clone>(values: &[T], n: usize) -> Vec<T> {
    values[values.len().saturating_sub(n)..].to_vec()
}

/// Signals implied by the latest crossover, priced at the last candle.
pub fn recent_signals(candles: &[Candle], indicators: &IndicatorSet) -> Vec<RecentSignal> {
    let (Some(last), Some(crossover)) = (candles.last(), indicators.crossover) else {
        return Vec::new();
    };

    let (kind, reason) = match crossover {
        Crossover::BullishCrossover => (SignalKind::Buy, "Fast EMA crosses above Slow EMA"),
        Crossover::BearishCrossover => (SignalKind::Sell, "Fast EMA crosses below Slow EMA"),
    };

    vec![RecentSignal {
        timestamp: last.timestamp,
        kind,
        price: last.close,
        strength: Confidence::Medium,
        reason: reason.to_string(),
    }]
}

fn last_values(values: &[f64], n: usize) -> String {
    let tail = tail(values, n);
    if tail.is_empty() {
        return "n/a".to_string();
    }
    tail.iter()
        .map(|v| format!("{:.4}", v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn label<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
}

/// Render the user prompt for `package`.
pub fn build_prompt(package: &DataPackage) -> String {
    let pretty = |value: serde_json::Value| serde_json::to_string_pretty(&value).unwrap_or_default();
    let indicators = &package.technical_indicators;
    let stoch: Vec<f64> = indicators.stoch_rsi.iter().map(|p| p.k).collect();

    format!(
        r#"# Trading analysis

## Task
Analyze the trading data below and recommend one of: **BUY**, **SELL** or **WAIT**.

## Context
- **Symbol**: {symbol}
- **Interval**: {interval}
- **Leverage**: {leverage}x (high risk!)
- **Position size**: ${position_size}
- **Risk tolerance**: {risk}

## Data

### Latest OHLCV candles:
{candles}

### Technical indicators:
- **Fast EMA (12)**: {fast}
- **Slow EMA (25)**: {slow}
- **RSI (14)**: {rsi}
- **Stochastic RSI %K**: {stoch}
- **Trend**: {trend}
- **EMA crossover**: {crossover}

### Market context:
{context}

### Recent signals:
{signals}

### Portfolio:
{portfolio}

## Required response format
Reply with a single JSON object and nothing else:
{{
  "decision": "BUY|SELL|WAIT",
  "confidence": "High|Medium|Low",
  "entry_price": number,
  "stop_loss": number,
  "take_profit": number,
  "risk_reward_ratio": number,
  "position_size": {position_size},
  "reasons": ["reason 1", "reason 2"],
  "warnings": ["warning 1", "warning 2"],
  "analysis": {{
    "trend_strength": "Strong|Medium|Weak",
    "volume_confirmation": true,
    "support_resistance": "key levels",
    "market_sentiment": "Bullish|Bearish|Neutral"
  }}
}}
"#,
        symbol = package.symbol.to_uppercase(),
        interval = package.interval,
        leverage = package.leverage,
        position_size = package.position_size,
        risk = package.risk_tolerance,
        candles = pretty(json!(tail(&package.ohlcv_data.candles, 5))),
        fast = last_values(&indicators.fast_ema, 3),
        slow = last_values(&indicators.slow_ema, 3),
        rsi = last_values(&indicators.rsi, 3),
        stoch = last_values(&stoch, 3),
        trend = label(indicators.trend),
        crossover = label(indicators.crossover),
        context = pretty(json!(package.market_context)),
        signals = pretty(json!(package.recent_signals)),
        portfolio = pretty(json!(package.portfolio_context)),
    )
}

/// Parse a model reply into a decision.
///
/// The reply must be exactly one JSON decision, optionally wrapped in a
/// single markdown code fence. Anything else yields the inconclusive decision.
pub fn parse_decision(text: &str, position_size: f64) -> Decision {
    match try_parse_decision(text) {
        Ok(mut decision) => {
            if decision.position_size.is_none() {
                decision.position_size = Some(position_size);
            }
            decision
        }
        Err(reason) => {
            warn!("Rejected model reply: {}", reason);
            Decision::inconclusive(position_size, "Model reply could not be parsed")
        }
    }
}

fn try_parse_decision(text: &str) -> Result<Decision, String> {
    let body = strip_fence(text.trim())?;
    let decision: Decision =
        serde_json::from_str(body).map_err(|e| format!("invalid decision JSON: {}", e))?;

    let prices = [
        decision.entry_price,
        decision.stop_loss,
        decision.take_profit,
        decision.risk_reward_ratio,
        decision.position_size,
    ];
    if prices.iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
        return Err("negative or non-finite numeric field".to_string());
    }
    Ok(decision)
}

fn strip_fence(text: &str) -> Result<&str, String> {
    let Some(rest) = text.strip_prefix("```") else {
        if text.contains("```") {
            return Err("text outside the code fence".to_string());
        }
        return Ok(text);
    };

    // Optional language tag on the opening line
    let (tag, body) = rest.split_once('\n').ok_or("unterminated code fence")?;
    if !tag.trim().is_empty() && !tag.trim().eq_ignore_ascii_case("json") {
        return Err(format!("unexpected code fence language {:?}", tag.trim()));
    }
    let body = body
        .trim_end()
        .strip_suffix("```")
        .ok_or("text after the code fence")?;
    if body.contains("```") {
        return Err("more than one code fence".to_string());
    }
    Ok(body.trim())
}

/// Turns a data package into a trading decision.
#[async_trait]
pub trait DecisionMaker: Send + Sync {
    fn name(&self) -> &str;

    async fn decide(&self, package: &DataPackage) -> anyhow::Result<Decision>;
}

/// Used when no model is configured: always inconclusive.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledDecisionMaker;

#[async_trait]
impl DecisionMaker for DisabledDecisionMaker {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn decide(&self, package: &DataPackage) -> anyhow::Result<Decision> {
        Ok(Decision::inconclusive(
            package.position_size,
            "Decision model not configured",
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Decision maker backed by an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct ChatModelDecisionMaker {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl ChatModelDecisionMaker {
    pub fn new(client: Client, api_key: String, config: &ModelConfig) -> Self {
        Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl DecisionMaker for ChatModelDecisionMaker {
    fn name(&self) -> &str {
        &self.model
    }

    async fn decide(&self, package: &DataPackage) -> anyhow::Result<Decision> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Requesting decision for {} from {}", package.symbol, self.model);

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(package) },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "chat completion returned HTTP {}: {}",
                status.as_u16(),
                text.chars().take(200).collect::<String>()
            ));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("chat completion response was not valid JSON")?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("chat completion returned no content"))?;

        let decision = parse_decision(&content, package.position_size);
        info!(
            "Model decision for {}: {} ({})",
            package.symbol, decision.action, decision.confidence
        );
        Ok(decision)
    }
}
