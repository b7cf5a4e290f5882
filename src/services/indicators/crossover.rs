//! Trend label and moving-average crossover detection.

use crate::types::{Crossover, Trend};

/// Trailing aligned points inspected for a crossover.
///
/// A crossover stays reported for up to three candles after it happens. Do
/// not narrow this to the last two points: fast `[100, 101, 102, 103]` over
/// slow `[102, 101, 100, 99]` must report a bullish crossover even though
/// fast is above slow on both of the last two points.
pub const CROSSOVER_LOOKBACK: usize = 4;

/// Bullish when the last fast value is above the last slow value.
pub fn trend(fast: &[f64], slow: &[f64]) -> Option<Trend> {
    let (fast, slow) = (fast.last()?, slow.last()?);
    Some(if fast > slow {
        Trend::Bullish
    } else {
        Trend::Bearish
    })
}

/// Most recent fast/slow ordering change within the trailing lookback.
///
/// Both sequences are aligned on their last element. Fast moving from
/// at-or-below slow to above it is a bullish crossover, the reverse a bearish
/// one. Fewer than two aligned points never yields a crossover.
pub fn detect_crossover(fast: &[f64], slow: &[f64]) -> Option<Crossover> {
    let n = fast.len().min(slow.len()).min(CROSSOVER_LOOKBACK);
    if n < 2 {
        return None;
    }

    let fast = &fast[fast.len() - n..];
    let slow = &slow[slow.len() - n..];
    let above: Vec<bool> = fast.iter().zip(slow).map(|(f, s)| f > s).collect();

    above
        .windows(2)
        .rev()
        .find_map(|w| match (w[0], w[1]) {
            (false, true) => Some(Crossover::BullishCrossover),
            (true, false) => Some(Crossover::BearishCrossover),
            _ => None,
        })
}
