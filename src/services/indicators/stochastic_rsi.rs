//! Stochastic oscillator applied to the RSI series.

use crate::types::StochRsiPoint;

/// Stochastic RSI.
///
/// raw = (rsi - lowest) / (highest - lowest) * 100 over `window` RSI values,
/// 50 when the window is flat. %K is the SMA(`k_smoothing`) of raw and %D
/// the SMA(`d_smoothing`) of %K. A point is emitted only once %D exists.
#[derive(Debug, Clone, Copy)]
pub struct StochasticRsi {
    window: usize,
    k_smoothing: usize,
    d_smoothing: usize,
}

impl Default for StochasticRsi {
    fn default() -> Self {
        Self {
            window: 14,
            k_smoothing: 3,
            d_smoothing: 3,
        }
    }
}

impl StochasticRsi {
    pub fn new(window: usize, k_smoothing: usize, d_smoothing: usize) -> Self {
        Self {
            window: window.max(1),
            k_smoothing: k_smoothing.max(1),
            d_smoothing: d_smoothing.max(1),
        }
    }

    /// RSI values needed before the first point appears.
    pub fn min_periods(&self) -> usize {
        self.window + self.k_smoothing + self.d_smoothing - 2
    }

    pub fn series(&self, rsi: &[f64]) -> Vec<StochRsiPoint> {
        if rsi.len() < self.min_periods() {
            return Vec::new();
        }

        let raw: Vec<f64> = rsi
            .windows(self.window)
            .map(|w| {
                let lowest = w.iter().copied().fold(f64::INFINITY, f64::min);
                let highest = w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let current = w[w.len() - 1];
                if highest != lowest {
                    (current - lowest) / (highest - lowest) * 100.0
                } else {
                    50.0
                }
            })
            .collect();

        let k = sma(&raw, self.k_smoothing);
        let d = sma(&k, self.d_smoothing);

        // Align raw and %K with %D on their trailing ends
        let raw_offset = raw.len() - d.len();
        let k_offset = k.len() - d.len();
        d.iter()
            .enumerate()
            .map(|(i, d)| StochRsiPoint {
                stoch_rsi: raw[raw_offset + i],
                k: k[k_offset + i],
                d: *d,
            })
            .collect()
    }
}

fn sma(values: &[f64], period: usize) -> Vec<f64> {
    values
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}
