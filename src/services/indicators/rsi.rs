//! Relative Strength Index (RSI).

/// RSI with Wilder smoothing.
///
/// The first value comes from the simple averages of the first `period`
/// price changes; every later value smooths the previous averages. Values
/// range from 0 to 100.
#[derive(Debug, Clone, Copy)]
pub struct Rsi {
    period: usize,
}

impl Default for Rsi {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Full RSI series, `max(0, len - period)` values long.
    pub fn series(&self, closes: &[f64]) -> Vec<f64> {
        if closes.len() < self.period + 1 {
            return Vec::new();
        }

        let (gains, losses): (Vec<f64>, Vec<f64>) = closes
            .windows(2)
            .map(|w| {
                let change = w[1] - w[0];
                if change > 0.0 {
                    (change, 0.0)
                } else {
                    (0.0, -change)
                }
            })
            .unzip();

        let period = self.period as f64;
        let mut avg_gain = gains.iter().take(self.period).sum::<f64>() / period;
        let mut avg_loss = losses.iter().take(self.period).sum::<f64>() / period;

        let mut values = Vec::with_capacity(gains.len() - self.period + 1);
        values.push(rsi_value(avg_gain, avg_loss));

        for i in self.period..gains.len() {
            avg_gain = (avg_gain * (period - 1.0) + gains[i]) / period;
            avg_loss = (avg_loss * (period - 1.0) + losses[i]) / period;
            values.push(rsi_value(avg_gain, avg_loss));
        }

        values
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    if avg_gain == 0.0 {
        return 0.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_length() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 3) as f64).collect();
        assert_eq!(Rsi::default().series(&closes).len(), 16);
        assert!(Rsi::default().series(&closes[..14]).is_empty());
        assert_eq!(Rsi::default().series(&closes[..15]).len(), 1);
    }

    #[test]
    fn test_rsi_only_gains_is_100() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let values = Rsi::default().series(&closes);
        assert!(values.iter().all(|v| *v == 100.0));
    }

    #[test]
    fn test_rsi_only_losses_is_0() {
        let closes: Vec<f64> = (0..20).map(|i| 200.0 - i as f64).collect();
        let values = Rsi::default().series(&closes);
        assert!(values.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_rsi_equal_gains_and_losses() {
        let closes: Vec<f64> = (0..15)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let values = Rsi::default().series(&closes);
        assert!((values[0] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_bounded() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + ((i * 7) % 11) as f64 - 5.0)
            .collect();
        for v in Rsi::default().series(&closes) {
            assert!((0.0..=100.0).contains(&v));
        }
    }
}
