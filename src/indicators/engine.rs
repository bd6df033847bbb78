// =============================================================================
// Indicator Engine: enrich a candle series with the full indicator set
// =============================================================================
//
// Input:  one series, ascending by open_time (never reordered here).
// Output: one IndicatorRow per input row, same order, same open_time values.
//
// The default mode is permissive: malformed rows are not detected and simply
// produce whatever the arithmetic yields.  `EngineOptions::strict` runs
// `validate_series` first and refuses the series on the first violation.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    atr, bollinger, macd, mfi, obv, rsi, ATR_PERIOD, BB_NUM_STD, BB_PERIOD, MACD_FAST,
    MACD_SIGNAL, MACD_SLOW, MFI_OVERBOUGHT, MFI_OVERSOLD, MFI_PERIOD, RSI_OVERBOUGHT,
    RSI_OVERSOLD, RSI_PERIOD,
};
use crate::market_data::{validate_series, Candle, ValidationError};

/// One enriched row: the source candle plus every indicator column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    #[serde(flatten)]
    pub candle: Candle,
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub bb_mid_20: Option<f64>,
    pub bb_up_20_2: Option<f64>,
    pub bb_lo_20_2: Option<f64>,
    pub atr_14: Option<f64>,
    pub obv: Option<f64>,
    pub mfi_14: Option<f64>,
    pub flag_overbought: bool,
    pub flag_oversold: bool,
}

pub type EnrichedSeries = Vec<IndicatorRow>;

/// Engine behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Validate the series before computing and fail on malformed input.
    #[serde(default)]
    pub strict: bool,
}

/// Stateless indicator engine.  Safe to share across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorEngine {
    options: EngineOptions,
}

impl IndicatorEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Enrich `candles`.  Only fails in strict mode.
    pub fn compute(&self, candles: &[Candle]) -> Result<EnrichedSeries, ValidationError> {
        if self.options.strict {
            validate_series(candles)?;
        }
        Ok(compute(candles))
    }
}

fn at_least(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v >= threshold)
}

fn at_most(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v <= threshold)
}

/// Enrich `candles` with every indicator column (permissive mode).
///
/// An empty series returns an empty series.
pub fn compute(candles: &[Candle]) -> EnrichedSeries {
    if candles.is_empty() {
        return Vec::new();
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let rsi = rsi::calculate_rsi(&closes, RSI_PERIOD);
    let macd = macd::calculate_macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let bb = bollinger::calculate_bollinger(&closes, BB_PERIOD, BB_NUM_STD);
    let atr = atr::calculate_atr(candles, ATR_PERIOD);
    let obv = obv::calculate_obv(candles);
    let mfi = mfi::calculate_mfi(candles, MFI_PERIOD);

    let rows: EnrichedSeries = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| IndicatorRow {
            candle: *candle,
            rsi_14: rsi[i],
            macd: macd.macd[i],
            macd_signal: macd.signal[i],
            macd_hist: macd.histogram[i],
            bb_mid_20: bb.middle[i],
            bb_up_20_2: bb.upper[i],
            bb_lo_20_2: bb.lower[i],
            atr_14: atr[i],
            obv: Some(obv[i]),
            mfi_14: mfi[i],
            flag_overbought: at_least(rsi[i], RSI_OVERBOUGHT) || at_least(mfi[i], MFI_OVERBOUGHT),
            flag_oversold: at_most(rsi[i], RSI_OVERSOLD) || at_most(mfi[i], MFI_OVERSOLD),
        })
        .collect();

    debug!(rows = rows.len(), "indicator columns computed");
    rows
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::COLUMNS;
    use chrono::{Duration, TimeZone, Utc};

    fn series(closes: &[f64], volume: Option<f64>) -> Vec<Candle> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(t0 + Duration::hours(i as i64), c, c + 1.0, c - 1.0, c, volume))
            .collect()
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + (i as f64 * 0.4).sin() * 8.0 + i as f64 * 0.1).collect()
    }

    #[test]
    fn empty_series_passes_through() {
        assert!(compute(&[]).is_empty());
        let strict = IndicatorEngine::new(EngineOptions { strict: true });
        assert!(strict.compute(&[]).unwrap().is_empty());
    }

    #[test]
    fn rows_are_preserved() {
        let input = series(&wave(50), Some(5.0));
        let out = compute(&input);
        assert_eq!(out.len(), input.len());
        for (row, candle) in out.iter().zip(&input) {
            assert_eq!(row.candle, *candle);
        }
    }

    #[test]
    fn warm_up_boundaries_on_constant_series() {
        let out = compute(&series(&[250.0; 40], None));

        for (i, row) in out.iter().enumerate() {
            assert_eq!(row.bb_mid_20.is_some(), i >= 19, "bb_mid_20 row {i}");
            assert_eq!(row.bb_up_20_2.is_some(), i >= 19, "bb_up_20_2 row {i}");
            assert_eq!(row.bb_lo_20_2.is_some(), i >= 19, "bb_lo_20_2 row {i}");
            assert_eq!(row.atr_14.is_some(), i >= 13, "atr_14 row {i}");
            assert_eq!(row.mfi_14.is_some(), i >= 13, "mfi_14 row {i}");
            assert_eq!(row.macd.is_some(), i >= 25, "macd row {i}");
            assert_eq!(row.macd_signal.is_some(), i >= 33, "macd_signal row {i}");
            assert!(row.rsi_14.is_some());
            assert!(row.obv.is_some());
        }
    }

    #[test]
    fn constant_series_without_volume_is_flagged_oversold() {
        // Flat prices: RSI = 0 everywhere, MFI = 0 once defined.
        let out = compute(&series(&[10.0; 20], None));
        assert!(out.iter().all(|r| r.flag_oversold));
        assert!(out.iter().all(|r| !r.flag_overbought));
    }

    #[test]
    fn rising_series_is_flagged_overbought() {
        let closes: Vec<f64> = (1..=40).map(|x| x as f64).collect();
        let out = compute(&series(&closes, Some(1.0)));
        let last = out.last().unwrap();
        assert!(last.rsi_14.unwrap() > 70.0);
        assert!(last.flag_overbought);
        assert!(!last.flag_oversold);
    }

    #[test]
    fn flags_agree_with_thresholds() {
        let out = compute(&series(&wave(120), Some(3.0)));
        for row in &out {
            let ob = row.rsi_14.is_some_and(|v| v >= 70.0) || row.mfi_14.is_some_and(|v| v >= 80.0);
            let os = row.rsi_14.is_some_and(|v| v <= 30.0) || row.mfi_14.is_some_and(|v| v <= 20.0);
            assert_eq!(row.flag_overbought, ob);
            assert_eq!(row.flag_oversold, os);
        }
    }

    #[test]
    fn rsi_stays_in_bounds() {
        let out = compute(&series(&wave(200), Some(1.0)));
        for v in out.iter().filter_map(|r| r.rsi_14) {
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn obv_two_rows() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let input = vec![
            Candle::new(t0, 100.0, 100.0, 100.0, 100.0, Some(10.0)),
            Candle::new(t0 + Duration::hours(1), 105.0, 105.0, 105.0, 105.0, Some(5.0)),
        ];
        let obv: Vec<Option<f64>> = compute(&input).iter().map(|r| r.obv).collect();
        assert_eq!(obv, vec![Some(0.0), Some(5.0)]);
    }

    #[test]
    fn strict_mode_rejects_unsorted_series() {
        let mut input = series(&wave(5), Some(1.0));
        input.swap(1, 3);
        let strict = IndicatorEngine::new(EngineOptions { strict: true });
        assert!(matches!(
            strict.compute(&input),
            Err(ValidationError::NonMonotonicTime { .. })
        ));
        // Permissive mode still produces a full-length result.
        assert_eq!(IndicatorEngine::default().compute(&input).unwrap().len(), 5);
    }

    #[test]
    fn serialised_row_uses_stable_column_names() {
        let out = compute(&series(&wave(3), Some(1.0)));
        let value = serde_json::to_value(&out[0]).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), COLUMNS.len());
        for name in COLUMNS {
            assert!(obj.contains_key(*name), "missing column {name}");
        }
    }
}
