// =============================================================================
// Moving Average Convergence / Divergence (MACD)
// =============================================================================
//
//   macd      = EMA(close, fast) - EMA(close, slow)
//   signal    = EMA(macd, signal_span)
//   histogram = macd - signal
//
// All three EMAs use SMA seeding (see `ema.rs`), so with the standard
// 12 / 26 / 9 parameters the MACD line first appears on row 25 and the signal
// line on row 33 (the 9th non-null MACD value).
// =============================================================================

use super::ema::{calculate_ema, calculate_ema_nullable};

/// The three MACD columns, each aligned with the input closes.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// Compute MACD, signal and histogram columns for `closes`.
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal_span: usize) -> MacdSeries {
    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);

    let macd: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let signal = calculate_ema_nullable(&macd, signal_span);

    let histogram = macd
        .iter()
        .zip(&signal)
        .map(|(m, s)| Some((*m)? - (*s)?))
        .collect();

    MacdSeries {
        macd,
        signal,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect()
    }

    fn first_defined(col: &[Option<f64>]) -> Option<usize> {
        col.iter().position(Option::is_some)
    }

    #[test]
    fn warm_up_boundaries_for_12_26_9() {
        let out = calculate_macd(&wave(60), 12, 26, 9);
        assert_eq!(first_defined(&out.macd), Some(25));
        assert_eq!(first_defined(&out.signal), Some(33));
        assert_eq!(first_defined(&out.histogram), Some(33));
    }

    #[test]
    fn histogram_is_macd_minus_signal() {
        let out = calculate_macd(&wave(80), 12, 26, 9);
        for i in 33..80 {
            let h = out.histogram[i].unwrap();
            let expected = out.macd[i].unwrap() - out.signal[i].unwrap();
            assert!((h - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn constant_series_has_zero_macd() {
        let out = calculate_macd(&[50.0; 40], 12, 26, 9);
        for v in out.macd.iter().flatten() {
            assert!(v.abs() < 1e-10);
        }
        for v in out.histogram.iter().flatten() {
            assert!(v.abs() < 1e-10);
        }
    }

    #[test]
    fn short_series_is_all_none() {
        let out = calculate_macd(&wave(20), 12, 26, 9);
        assert!(out.macd.iter().all(Option::is_none));
        assert!(out.signal.iter().all(Option::is_none));
        assert_eq!(out.macd.len(), 20);
    }

    #[test]
    fn rising_series_has_positive_macd() {
        let closes: Vec<f64> = (1..=60).map(|x| x as f64).collect();
        let out = calculate_macd(&closes, 12, 26, 9);
        assert!(out.macd[59].unwrap() > 0.0);
    }
}
