// =============================================================================
// Relative Strength Index (RSI): Wilder's Smoothing
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1: Compute price changes (deltas) from consecutive closes.  The first
//         row has no previous close; its delta counts as 0.
// Step 2: Split into gain = max(delta, 0) and loss = max(-delta, 0).
// Step 3: Smooth both with Wilder's recursive average, alpha = 1 / period,
//         seeded from the very first value (no SMA warm-up):
//           avg_0 = x_0
//           avg_t = (1 - alpha) * avg_{t-1} + alpha * x_t
// Step 4: RS  = avg_gain / (avg_loss + EPSILON)
//         RSI = 100 - 100 / (1 + RS)
//
// Because the smoothing seeds immediately, RSI is defined on every row.  The
// first rows are noisy; row 0 is always 0 (no gain yet).
// =============================================================================

use super::EPSILON;

/// Compute the RSI column for `closes`.
///
/// The output is aligned with `closes`.
///
/// # Edge cases
/// - `period == 0` => all `None`
/// - NaN closes produce NaN deltas, which classify as neither gain nor loss.
/// - Zero average loss is guarded by `EPSILON`, so an all-gain run converges
///   to 100 instead of dividing by zero.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; closes.len()];
    }

    let alpha = 1.0 / period as f64;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    let mut out = Vec::with_capacity(closes.len());

    for (i, &close) in closes.iter().enumerate() {
        let delta = if i == 0 { 0.0 } else { close - closes[i - 1] };
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { -delta } else { 0.0 };

        if i == 0 {
            avg_gain = gain;
            avg_loss = loss;
        } else {
            avg_gain = (1.0 - alpha) * avg_gain + alpha * gain;
            avg_loss = (1.0 - alpha) * avg_loss + alpha * loss;
        }

        let rs = avg_gain / (avg_loss + EPSILON);
        out.push(Some(100.0 - 100.0 / (1.0 + rs)));
    }

    out
}
