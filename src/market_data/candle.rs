// =============================================================================
// Candle: one OHLCV row of a series
// =============================================================================
//
// A series is a plain slice of candles ordered ascending by `open_time`.  The
// indicator engine and the resampler never reorder rows; callers are expected
// to run `sort_by_open_time` right after fetching.
// =============================================================================

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A single OHLCV candle.
///
/// `volume` is optional because price-only sources (index feeds, CoinGecko
/// OHLC) do not report traded volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl Candle {
    pub fn new(
        open_time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<f64>,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Build a candle from a millisecond UNIX epoch, the unit every supported
    /// exchange reports open times in.
    ///
    /// Returns `None` when the timestamp is out of chrono's representable range.
    pub fn from_millis(
        open_time_ms: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<f64>,
    ) -> Option<Self> {
        let open_time = Utc.timestamp_millis_opt(open_time_ms).single()?;
        Some(Self::new(open_time, open, high, low, close, volume))
    }

    /// Volume with missing values read as zero.
    pub fn volume_or_zero(&self) -> f64 {
        self.volume.unwrap_or(0.0)
    }

    /// Typical price `(high + low + close) / 3`.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Sort a series ascending by `open_time`.
///
/// The sort is stable so rows sharing an `open_time` keep their fetch order.
pub fn sort_by_open_time(candles: &mut [Candle]) {
    candles.sort_by_key(|c| c.open_time);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64, close: f64) -> Candle {
        Candle::from_millis(ms, close, close, close, close, Some(1.0)).unwrap()
    }

    #[test]
    fn from_millis_is_utc() {
        let c = at(1_700_000_000_000, 1.0);
        assert_eq!(c.open_time.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(c.open_time.to_rfc3339(), "2023-11-14T22:13:20+00:00");
    }

    #[test]
    fn missing_volume_reads_as_zero() {
        let mut c = at(0, 10.0);
        c.volume = None;
        assert_eq!(c.volume_or_zero(), 0.0);
    }

    #[test]
    fn typical_price_averages_hlc() {
        let c = Candle::from_millis(0, 1.0, 12.0, 6.0, 9.0, None).unwrap();
        assert!((c.typical_price() - 9.0).abs() < 1e-12);
    }

    #[test]
    fn sort_is_stable_for_equal_times() {
        let mut rows = vec![at(2_000, 3.0), at(1_000, 1.0), at(1_000, 2.0)];
        sort_by_open_time(&mut rows);
        let closes: Vec<f64> = rows.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
    }
}
