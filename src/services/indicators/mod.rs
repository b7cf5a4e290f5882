//! Indicator engine.
//!
//! Pure functions over a canonical candle series. Every output sequence is
//! aligned on the last candle.

pub mod crossover;
pub mod ema;
pub mod rsi;
pub mod stochastic_rsi;

pub use crossover::{detect_crossover, trend};
pub use ema::Ema;
pub use rsi::Rsi;
pub use stochastic_rsi::StochasticRsi;

use crate::error::AnalysisError;
use crate::types::{Candle, IndicatorSet};

pub const EMA_FAST: usize = 12;
pub const EMA_SLOW: usize = 25;
pub const RSI_PERIOD: usize = 14;

/// Compute the full indicator set for `candles`.
///
/// Series too short for a given indicator yield an empty sequence for it;
/// only an empty series is an error.
pub fn compute(candles: &[Candle]) -> Result<IndicatorSet, AnalysisError> {
    if candles.is_empty() {
        return Err(AnalysisError::InsufficientData(
            "cannot compute indicators on an empty series".to_string(),
        ));
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let fast_ema = Ema::new(EMA_FAST).series(&closes);
    let slow_ema = Ema::new(EMA_SLOW).series(&closes);
    let rsi = Rsi::new(RSI_PERIOD).series(&closes);
    let stoch_rsi = StochasticRsi::default().series(&rsi);

    let trend = trend(&fast_ema, &slow_ema);
    let crossover = detect_crossover(&fast_ema, &slow_ema);

    Ok(IndicatorSet {
        fast_ema,
        slow_ema,
        rsi,
        stoch_rsi,
        trend,
        crossover,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Trend;
    use chrono::{Duration, TimeZone, Utc};

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| Candle {
                timestamp: start + Duration::hours(i as i64),
                open: *close,
                high: close + 1.0,
                low: close - 1.0,
                close: *close,
                volume: 10.0,
            })
            .collect()
    }

    #[test]
    fn test_empty_series_is_insufficient() {
        let err = compute(&[]).unwrap_err();
        assert_eq!(err.kind(), "insufficient_data");
    }

    #[test]
    fn test_short_series_has_empty_sequences() {
        let set = compute(&candles_from_closes(&[100.0; 5])).unwrap();
        assert!(set.fast_ema.is_empty());
        assert!(set.slow_ema.is_empty());
        assert!(set.rsi.is_empty());
        assert!(set.stoch_rsi.is_empty());
        assert_eq!(set.trend, None);
        assert_eq!(set.crossover, None);
    }

    #[test]
    fn test_sequence_lengths() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + (i % 7) as f64).collect();
        let set = compute(&candles_from_closes(&closes)).unwrap();
        assert_eq!(set.fast_ema.len(), 100 - EMA_FAST + 1);
        assert_eq!(set.slow_ema.len(), 100 - EMA_SLOW + 1);
        assert_eq!(set.rsi.len(), 100 - RSI_PERIOD);
        assert_eq!(set.stoch_rsi.len(), set.rsi.len() - 18 + 1);
    }

    #[test]
    fn test_uptrend_is_bullish() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 2.0).collect();
        let set = compute(&candles_from_closes(&closes)).unwrap();
        assert_eq!(set.trend, Some(Trend::Bullish));
        assert_eq!(set.crossover, None);
        assert_eq!(*set.rsi.last().unwrap(), 100.0);
    }

    #[test]
    fn test_deterministic() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + ((i * 37) % 19) as f64).collect();
        let candles = candles_from_closes(&closes);
        assert_eq!(compute(&candles).unwrap(), compute(&candles).unwrap());
    }
}
