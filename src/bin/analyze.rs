//! One-shot analysis from the command line.
//!
//! Usage: `analyze [SYMBOL]` (defaults to `DEFAULT_SYMBOL`).

use augur::config::Config;
use augur::services::Analyzer;
use augur::types::{AnalysisResult, DecisionAction};
use std::fmt::Write;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "augur=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let symbol = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.analysis.default_symbol.clone());

    println!("Analyzing {}...", symbol);
    let analyzer = Analyzer::from_config(&config);

    let started = Instant::now();
    match analyzer.analyze(&symbol).await {
        Ok(analysis) => {
            print!("{}", render_report(&analysis.result, started.elapsed()));
            Ok(())
        }
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            if e.kind() == "data_unavailable" {
                eprintln!("Check network access and provider API keys in .env");
            }
            std::process::exit(1);
        }
    }
}

fn render_report(result: &AnalysisResult, elapsed: Duration) -> String {
    let mut out = String::new();
    let summary = &result.summary;
    let decision = &result.decision;

    let _ = writeln!(out, "\nANALYSIS RESULT");
    let _ = writeln!(out, "===============");
    let _ = writeln!(out, "Symbol: {}", result.symbol.to_uppercase());
    let _ = writeln!(out, "Interval: {}", result.interval);
    let _ = writeln!(out, "Duration: {}ms", elapsed.as_millis());
    let _ = writeln!(out, "Last price: ${}", summary.last_price);
    let _ = writeln!(out, "Trend: {}", label(summary.trend));
    let _ = writeln!(out, "Crossover: {}", label(summary.crossover));
    if let Some(rsi) = summary.rsi {
        let _ = writeln!(out, "RSI: {:.2}", rsi);
    }

    let _ = writeln!(out, "\nDECISION");
    let _ = writeln!(out, "========");
    let _ = writeln!(out, "Decision: {}", decision.action);
    let _ = writeln!(out, "Confidence: {}", decision.confidence);
    if let Some(price) = decision.entry_price {
        let _ = writeln!(out, "Entry price: ${}", price);
    }
    if let Some(price) = decision.stop_loss {
        let _ = writeln!(out, "Stop loss: ${}", price);
    }
    if let Some(price) = decision.take_profit {
        let _ = writeln!(out, "Take profit: ${}", price);
    }
    if let Some(ratio) = decision.risk_reward_ratio {
        let _ = writeln!(out, "Risk/reward: {}", ratio);
    }

    if !decision.reasons.is_empty() {
        let _ = writeln!(out, "\nReasons:");
        for (i, reason) in decision.reasons.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, reason);
        }
    }
    if !decision.warnings.is_empty() {
        let _ = writeln!(out, "\nWarnings:");
        for (i, warning) in decision.warnings.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, warning);
        }
    }

    if let Some(ref details) = decision.details {
        let _ = writeln!(out, "\nDETAILS");
        let _ = writeln!(out, "=======");
        let _ = writeln!(out, "Trend strength: {}", details.trend_strength.as_deref().unwrap_or("n/a"));
        let _ = writeln!(
            out,
            "Volume confirmation: {}",
            if details.volume_confirmation == Some(true) { "yes" } else { "no" }
        );
        let _ = writeln!(out, "Market sentiment: {}", details.market_sentiment.as_deref().unwrap_or("n/a"));
        if let Some(ref levels) = details.support_resistance {
            let _ = writeln!(out, "Support/resistance: {}", levels);
        }
    }

    let color = match decision.action {
        DecisionAction::Buy => GREEN,
        DecisionAction::Sell => RED,
        DecisionAction::Wait => YELLOW,
    };
    let _ = writeln!(out, "\n{}RECOMMENDATION: {}{}", color, decision.action, RESET);
    let _ = writeln!(out, "{}CONFIDENCE: {}{}", color, decision.confidence, RESET);
    if decision.action != DecisionAction::Wait {
        if let Some(size) = decision.position_size {
            let _ = writeln!(out, "{}POSITION SIZE: ${}{}", color, size, RESET);
        }
    }

    let _ = writeln!(out, "\nThis tool is for educational purposes. Do your own research before trading.");
    out
}

fn label<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur::types::{Decision, FundamentalsSnapshot, IndicatorSummary, Interval, Trend};
    use chrono::Utc;
    use uuid::Uuid;

    fn result(decision: Decision) -> AnalysisResult {
        AnalysisResult {
            id: Uuid::new_v4(),
            symbol: "eth".to_string(),
            interval: Interval::OneHour,
            timestamp: Utc::now(),
            decision,
            summary: IndicatorSummary {
                candles_count: 100,
                last_price: 2500.5,
                last_candle_at: Utc::now(),
                trend: Some(Trend::Bullish),
                crossover: None,
                fast_ema: Some(2490.0),
                slow_ema: Some(2470.0),
                rsi: Some(61.234),
                stoch_k: None,
                stoch_d: None,
            },
            fundamentals: FundamentalsSnapshot::unknown(),
            signals: vec![],
        }
    }

    #[test]
    fn test_report_for_inconclusive_decision() {
        let report = render_report(
            &result(Decision::inconclusive(1000.0, "Decision model not configured")),
            Duration::from_millis(42),
        );
        assert!(report.contains("Symbol: ETH"));
        assert!(report.contains("Duration: 42ms"));
        assert!(report.contains("Trend: bullish"));
        assert!(report.contains("Crossover: none"));
        assert!(report.contains("RSI: 61.23"));
        assert!(report.contains("1. Decision model not configured"));
        assert!(report.contains("RECOMMENDATION: WAIT"));
        assert!(!report.contains("POSITION SIZE"));
    }

    #[test]
    fn test_report_for_buy_decision() {
        let mut decision = Decision::inconclusive(500.0, "Strong trend");
        decision.action = DecisionAction::Buy;
        decision.entry_price = Some(2500.0);
        decision.stop_loss = Some(2400.0);

        let report = render_report(&result(decision), Duration::ZERO);
        assert!(report.contains("Entry price: $2500"));
        assert!(report.contains("Stop loss: $2400"));
        assert!(report.contains("POSITION SIZE: $500"));
    }
}
