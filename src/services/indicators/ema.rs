//! Exponential Moving Average (EMA).

/// EMA over closing prices.
///
/// Seeded with the SMA of the first `period` closes, then smoothed with the
/// multiplier `2 / (period + 1)`. The series has one value per close from
/// index `period - 1` on.
#[derive(Debug, Clone, Copy)]
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Full EMA series, `max(0, len - period + 1)` values long.
    pub fn series(&self, closes: &[f64]) -> Vec<f64> {
        if closes.len() < self.period {
            return Vec::new();
        }

        let multiplier = 2.0 / (self.period as f64 + 1.0);

        // First EMA is SMA
        let sma = closes.iter().take(self.period).sum::<f64>() / self.period as f64;

        let mut values = Vec::with_capacity(closes.len() - self.period + 1);
        values.push(sma);

        let mut ema = sma;
        for close in &closes[self.period..] {
            ema = (close - ema) * multiplier + ema;
            values.push(ema);
        }

        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_length() {
        let closes: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        assert_eq!(Ema::new(12).series(&closes).len(), 19);
        assert_eq!(Ema::new(25).series(&closes).len(), 6);
        assert!(Ema::new(31).series(&closes).is_empty());
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let closes = [2.0, 4.0, 6.0, 8.0];
        let values = Ema::new(3).series(&closes);
        assert_eq!(values[0], 4.0);
        // (8 - 4) * 0.5 + 4
        assert_eq!(values[1], 6.0);
    }

    #[test]
    fn test_ema_constant_series() {
        let closes = vec![50.0; 40];
        let values = Ema::new(12).series(&closes);
        assert!(values.iter().all(|v| (v - 50.0).abs() < 1e-9));
    }

    #[test]
    fn test_ema_follows_uptrend() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let values = Ema::new(12).series(&closes);
        assert!(values.windows(2).all(|w| w[1] > w[0]));
        assert!(*values.last().unwrap() < 139.0);
    }
}
