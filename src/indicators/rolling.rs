// =============================================================================
// Trailing-window helpers
// =============================================================================
//
// Every helper returns a vector aligned with its input: element `i` describes
// the window ending at row `i`.  Rows before the first full window are `None`,
// and so is any window containing a NaN (a window is only "full" when it holds
// `period` real observations).
// =============================================================================

/// Apply `f` to each full trailing window of `values`.
fn rolling_map<F>(values: &[f64], period: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    for (i, window) in values.windows(period).enumerate() {
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i + period - 1] = Some(f(window));
    }
    out
}

/// Trailing sum over `period` rows.
pub fn rolling_sum(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling_map(values, period, |w| w.iter().sum())
}

/// Trailing simple moving average over `period` rows.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling_map(values, period, |w| w.iter().sum::<f64>() / w.len() as f64)
}

/// Trailing sample standard deviation (divisor `period - 1`).
///
/// A one-row window has no sample deviation and yields NaN.
pub fn rolling_sample_std(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling_map(values, period, |w| {
        let n = w.len() as f64;
        let mean = w.iter().sum::<f64>() / n;
        let ss = w.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
        (ss / (n - 1.0)).sqrt()
    })
}
