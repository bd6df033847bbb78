// =============================================================================
// Average True Range (ATR)
// =============================================================================
//
// ATR measures market volatility by decomposing the entire range of a bar.
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// The first bar has no previous close, so its TR is simply H - L.  NaN terms
// are skipped by the max, so a missing previous close degrades to H - L as
// well.
//
// ATR here is the simple moving average of TR over `period` bars, so the
// first `period - 1` rows are undefined.
//
// Default period: 14
// =============================================================================

use super::rolling::rolling_mean;
use crate::market_data::Candle;

/// True range of every bar, aligned with `candles`.
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let hl = c.high - c.low;
            if i == 0 {
                return hl;
            }
            let prev_close = candles[i - 1].close;
            let hc = (c.high - prev_close).abs();
            let lc = (c.low - prev_close).abs();
            // f64::max ignores a NaN operand.
            hl.max(hc).max(lc)
        })
        .collect()
}

/// Compute the ATR column for `candles`.
pub fn calculate_atr(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    rolling_mean(&true_range(candles), period)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    /// Build a test candle with the given OHLC values.
    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(Utc.timestamp_opt(0, 0).unwrap(), open, high, low, close, Some(100.0))
    }

    #[test]
    fn first_bar_uses_high_minus_low() {
        let tr = true_range(&[candle(100.0, 105.0, 95.0, 102.0)]);
        assert_eq!(tr, vec![10.0]);
    }

    #[test]
    fn true_range_uses_prev_close_on_gap() {
        let candles = vec![
            candle(100.0, 105.0, 95.0, 95.0),   // close at low
            candle(110.0, 115.0, 108.0, 112.0), // gap up: |115-95|=20 > 115-108=7
        ];
        let tr = true_range(&candles);
        assert_eq!(tr[1], 20.0);
    }

    #[test]
    fn true_range_gap_down() {
        let candles = vec![
            candle(100.0, 101.0, 99.0, 100.0),
            candle(90.0, 92.0, 88.0, 91.0), // |88-100| = 12
        ];
        assert_eq!(true_range(&candles)[1], 12.0);
    }

    #[test]
    fn atr_warm_up_rows_are_none() {
        let candles = vec![candle(100.0, 105.0, 95.0, 102.0); 20];
        let atr = calculate_atr(&candles, 14);
        assert!(atr[..13].iter().all(Option::is_none));
        assert!(atr[13..].iter().all(Option::is_some));
    }

    #[test]
    fn atr_is_simple_mean_of_true_range() {
        let candles: Vec<Candle> = (0..20)
            .map(|i| {
                let base = 100.0 + i as f64;
                candle(base, base + 3.0, base - 3.0, base + 1.0)
            })
            .collect();
        let tr = true_range(&candles);
        let atr = calculate_atr(&candles, 14);
        let expected: f64 = tr[6..20].iter().sum::<f64>() / 14.0;
        assert!((atr[19].unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn atr_constant_range() {
        // Every bar spans 10 and closes at its midpoint with a slight drift.
        let candles: Vec<Candle> = (0..30)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.1;
                candle(base, base + 5.0, base - 5.0, base)
            })
            .collect();
        let atr = calculate_atr(&candles, 14)[29].unwrap();
        assert!((atr - 10.0).abs() < 1.0, "expected ATR near 10.0, got {atr}");
    }

    #[test]
    fn atr_insufficient_data() {
        let candles = vec![candle(100.0, 105.0, 95.0, 102.0); 10];
        assert!(calculate_atr(&candles, 14).iter().all(Option::is_none));
    }
}
