// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (span + 1)
//   EMA_t      = x_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The first EMA value is the SMA of the first `span` observations and is
// emitted on the row where the `span`-th observation arrives.  Earlier rows
// are `None`.
// =============================================================================

/// Compute the EMA of a nullable input column.
///
/// The output is aligned with `values`.  `None` inputs produce `None` outputs
/// and do not advance the recursion, so a column with a null prefix (such as
/// the MACD line) is seeded from its first `span` real observations.
///
/// # Edge cases
/// - `span == 0` => all `None`
/// - fewer than `span` observations => all `None`
/// - NaN observations propagate through the recursion (garbage in, garbage out).
pub fn calculate_ema_nullable(values: &[Option<f64>], span: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if span == 0 {
        return out;
    }

    let multiplier = 2.0 / (span + 1) as f64;
    let mut seen = 0usize;
    let mut seed_sum = 0.0;
    let mut prev_ema: Option<f64> = None;

    for (i, value) in values.iter().enumerate() {
        let Some(x) = *value else {
            continue;
        };

        match prev_ema {
            Some(prev) => {
                let ema = x * multiplier + prev * (1.0 - multiplier);
                out[i] = Some(ema);
                prev_ema = Some(ema);
            }
            None => {
                seen += 1;
                seed_sum += x;
                if seen == span {
                    let sma = seed_sum / span as f64;
                    out[i] = Some(sma);
                    prev_ema = Some(sma);
                }
            }
        }
    }

    out
}

/// Compute the EMA of a fully populated column (e.g. closes).
pub fn calculate_ema(values: &[f64], span: usize) -> Vec<Option<f64>> {
    let wrapped: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    calculate_ema_nullable(&wrapped, span)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_empty_input() {
        assert!(calculate_ema(&[], 5).is_empty());
    }

    #[test]
    fn ema_span_zero() {
        assert_eq!(calculate_ema(&[1.0, 2.0, 3.0], 0), vec![None, None, None]);
    }

    #[test]
    fn ema_insufficient_data() {
        assert_eq!(calculate_ema(&[1.0, 2.0], 5), vec![None, None]);
    }

    #[test]
    fn ema_span_equals_length() {
        let ema = calculate_ema(&[2.0, 4.0, 6.0], 3);
        // Should be the SMA = (2+4+6)/3 = 4.0 on the last row.
        assert!(ema[..2].iter().all(Option::is_none));
        assert!((ema[2].unwrap() - 4.0).abs() < 1e-10);
    }

    #[test]
    fn ema_known_values() {
        // 5-span EMA of [1..=10]: SMA of first 5 = 3.0, multiplier = 1/3.
        let closes: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let ema = calculate_ema(&closes, 5);
        assert_eq!(ema.len(), 10);
        assert!(ema[..4].iter().all(Option::is_none));

        let mult = 2.0 / 6.0;
        let mut expected = 3.0;
        assert!((ema[4].unwrap() - expected).abs() < 1e-10);
        for i in 5..10 {
            expected = closes[i] * mult + expected * (1.0 - mult);
            let got = ema[i].unwrap();
            assert!((got - expected).abs() < 1e-10, "row {i}: got {got}, expected {expected}");
        }
    }

    #[test]
    fn ema_seeding_counts_from_first_observation() {
        let mut values = vec![None; 4];
        values.extend([1.0, 2.0, 3.0, 4.0].map(Some));
        let ema = calculate_ema_nullable(&values, 3);
        assert!(ema[..6].iter().all(Option::is_none));
        assert!((ema[6].unwrap() - 2.0).abs() < 1e-12);
        assert!((ema[7].unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn ema_constant_series_stays_constant() {
        let ema = calculate_ema(&[42.0; 30], 12);
        for v in ema.iter().skip(11) {
            assert!((v.unwrap() - 42.0).abs() < 1e-10);
        }
    }
}
