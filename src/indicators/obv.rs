// =============================================================================
// On-Balance Volume (OBV)
// =============================================================================
//
// OBV is a running total of volume signed by the direction of the close:
//   OBV_t = OBV_{t-1} + volume_t * sign(close_t - close_{t-1})
//
// The first row has no previous close and contributes 0.  Missing volume
// counts as 0, and any NaN contribution (from a NaN close) is dropped so the
// running total never turns NaN.

use crate::market_data::Candle;

fn direction(delta: f64) -> f64 {
    if delta > 0.0 {
        1.0
    } else if delta < 0.0 {
        -1.0
    } else if delta == 0.0 {
        0.0
    } else {
        f64::NAN
    }
}

/// Compute the OBV column, defined on every row.
pub fn calculate_obv(candles: &[Candle]) -> Vec<f64> {
    let mut obv = 0.0;
    let mut out = Vec::with_capacity(candles.len());

    for (i, c) in candles.iter().enumerate() {
        if i > 0 {
            let flow = c.volume_or_zero() * direction(c.close - candles[i - 1].close);
            if !flow.is_nan() {
                obv += flow;
            }
        }
        out.push(obv);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(close: f64, volume: Option<f64>) -> Candle {
        Candle::new(Utc.timestamp_opt(0, 0).unwrap(), close, close, close, close, volume)
    }

    #[test]
    fn two_row_rise() {
        let obv = calculate_obv(&[bar(100.0, Some(10.0)), bar(105.0, Some(5.0))]);
        assert_eq!(obv, vec![0.0, 5.0]);
    }

    #[test]
    fn falls_subtract_and_flats_hold() {
        let rows = vec![
            bar(10.0, Some(1.0)),
            bar(11.0, Some(4.0)),
            bar(9.0, Some(3.0)),
            bar(9.0, Some(7.0)),
        ];
        assert_eq!(calculate_obv(&rows), vec![0.0, 4.0, 1.0, 1.0]);
    }

    #[test]
    fn missing_volume_is_zero() {
        let rows = vec![bar(10.0, None), bar(11.0, None), bar(12.0, Some(2.0))];
        assert_eq!(calculate_obv(&rows), vec![0.0, 0.0, 2.0]);
    }

    #[test]
    fn nan_close_contributes_nothing() {
        let rows = vec![bar(10.0, Some(1.0)), bar(f64::NAN, Some(5.0)), bar(12.0, Some(2.0))];
        assert_eq!(calculate_obv(&rows), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn empty_input() {
        assert!(calculate_obv(&[]).is_empty());
    }
}
