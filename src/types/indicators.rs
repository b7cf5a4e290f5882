use serde::{Deserialize, Serialize};
use std::fmt;

/// Trend label derived from the last fast and slow EMA values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Bullish => write!(f, "bullish"),
            Trend::Bearish => write!(f, "bearish"),
        }
    }
}

/// Moving-average crossover event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crossover {
    BullishCrossover,
    BearishCrossover,
}

impl fmt::Display for Crossover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crossover::BullishCrossover => write!(f, "bullish_crossover"),
            Crossover::BearishCrossover => write!(f, "bearish_crossover"),
        }
    }
}

/// One stochastic-RSI sample with its smoothed %K and %D lines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochRsiPoint {
    pub stoch_rsi: f64,
    pub k: f64,
    pub d: f64,
}

/// Indicators derived from one candle series.
///
/// Every sequence ends on the last candle of the source series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub fast_ema: Vec<f64>,
    pub slow_ema: Vec<f64>,
    pub rsi: Vec<f64>,
    pub stoch_rsi: Vec<StochRsiPoint>,
    pub trend: Option<Trend>,
    pub crossover: Option<Crossover>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_serialization() {
        assert_eq!(serde_json::to_string(&Trend::Bullish).unwrap(), "\"bullish\"");
        assert_eq!(Trend::Bearish.to_string(), "bearish");
    }

    #[test]
    fn test_crossover_serialization() {
        assert_eq!(
            serde_json::to_string(&Crossover::BullishCrossover).unwrap(),
            "\"bullish_crossover\""
        );
        let parsed: Crossover = serde_json::from_str("\"bearish_crossover\"").unwrap();
        assert_eq!(parsed, Crossover::BearishCrossover);
    }
}
