// =============================================================================
// Money Flow Index (MFI)
// =============================================================================
//
// A volume-weighted RSI analogue.
//
//   TP  = (high + low + close) / 3
//   RMF = TP * volume                      (missing volume => 0)
//   positive flow = RMF when TP > TP_prev, else 0
//   negative flow = RMF when TP < TP_prev, else 0
//   MFR = sum(positive, period) / (sum(negative, period) + EPSILON)
//   MFI = 100 - 100 / (1 + MFR)
//
// Row 0 has no previous TP and contributes no flow.  Both sums need a full
// window, so the first `period - 1` rows are undefined.
//
// Zero-volume or flat windows give MFR = 0 and therefore MFI = 0; the epsilon
// guard is what keeps those rows finite.
// =============================================================================

use super::rolling::rolling_sum;
use super::EPSILON;
use crate::market_data::Candle;

/// Compute the MFI column for `candles`.
pub fn calculate_mfi(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    let mut positive = Vec::with_capacity(candles.len());
    let mut negative = Vec::with_capacity(candles.len());
    let mut prev_tp: Option<f64> = None;

    for c in candles {
        let tp = c.typical_price();
        let raw_money = tp * c.volume_or_zero();

        let (pos, neg) = match prev_tp {
            Some(prev) if tp > prev => (raw_money, 0.0),
            Some(prev) if tp < prev => (0.0, raw_money),
            _ => (0.0, 0.0),
        };
        positive.push(pos);
        negative.push(neg);
        prev_tp = Some(tp);
    }

    let pos_sum = rolling_sum(&positive, period);
    let neg_sum = rolling_sum(&negative, period);

    pos_sum
        .iter()
        .zip(&neg_sum)
        .map(|(p, n)| {
            let ratio = (*p)? / ((*n)? + EPSILON);
            Some(100.0 - 100.0 / (1.0 + ratio))
        })
        .collect()
}
