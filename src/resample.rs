// =============================================================================
// Resampler: aggregate a candle series into coarser UTC buckets
// =============================================================================
//
// Reducers per bucket:
//   open   = first row's open (first non-NaN, in time order)
//   high   = max high
//   low    = min low
//   close  = last row's close (last non-NaN, in time order)
//   volume = sum of volumes, missing or NaN volume counted as 0
//
// Only buckets that received at least one row are emitted: gaps in the source
// stay gaps, nothing is interpolated.  Output is ascending by bucket start.
//
// Bucket anchoring:
//   fixed periods (minutes / hours / days)  00:00 UTC of the earliest row's day
//   weeks                                  Monday 00:00 UTC
//   months                                 the 1st, 00:00 UTC
// =============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::market_data::{sort_by_open_time, validate_series, Candle, ValidationError};

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// Target bucket size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// A fixed-length bucket (minutes, hours or days).
    Fixed(FixedSpan),
    /// Calendar week starting Monday.
    Week,
    /// Calendar month.
    Month,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodParseError {
    #[error("empty period string")]
    Empty,
    #[error("invalid period count in '{0}'")]
    InvalidCount(String),
    #[error("unknown period unit in '{0}'")]
    UnknownUnit(String),
    #[error("'{0}': weeks and months only support a count of 1")]
    UnsupportedMultiple(String),
    #[error("period length must be between 1 and 100000 units, got {0}")]
    OutOfRange(i64),
}

/// Length of a fixed bucket.  Always positive: the only way to build one is
/// through `Period::minutes`, `Period::hours` or `Period::days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSpan(Duration);

impl FixedSpan {
    pub fn duration(&self) -> Duration {
        self.0
    }
}

impl Period {
    pub fn minutes(n: i64) -> Result<Self, PeriodParseError> {
        Self::fixed(n, Duration::minutes)
    }

    pub fn hours(n: i64) -> Result<Self, PeriodParseError> {
        Self::fixed(n, Duration::hours)
    }

    pub fn days(n: i64) -> Result<Self, PeriodParseError> {
        Self::fixed(n, Duration::days)
    }

    fn fixed(n: i64, unit: fn(i64) -> Duration) -> Result<Self, PeriodParseError> {
        if !(1..=MAX_COUNT).contains(&n) {
            return Err(PeriodParseError::OutOfRange(n));
        }
        Ok(Self::Fixed(FixedSpan(unit(n))))
    }

    /// Start of the bucket containing `t`.  `origin` anchors fixed periods.
    fn bucket_start(&self, t: DateTime<Utc>, origin: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Fixed(span) => {
                let len_ms = span.0.num_milliseconds();
                let offset = (t - origin).num_milliseconds();
                origin + Duration::milliseconds(offset.div_euclid(len_ms) * len_ms)
            }
            Self::Week => {
                let back = i64::from(t.weekday().num_days_from_monday());
                midnight(t) - Duration::days(back)
            }
            Self::Month => Utc
                .with_ymd_and_hms(t.year(), t.month(), 1, 0, 0, 0)
                .single()
                .unwrap_or_else(|| midnight(t)),
        }
    }
}

/// Upper bound on the numeric part of a period; keeps the duration
/// arithmetic far from overflow.
pub const MAX_COUNT: i64 = 100_000;

fn midnight(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

impl FromStr for Period {
    type Err = PeriodParseError;

    /// Accepts compact interval names (`15m`, `4h`, `1d`, `1w`, `1M`) and
    /// spelled-out forms (`1 hour`, `4 hours`, `1 day`, `1 month`).  A lower
    /// case `m` is minutes; an upper case `M` is months.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PeriodParseError::Empty);
        }

        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);
        let unit = unit.trim();

        let count: i64 = if digits.is_empty() {
            1
        } else {
            digits
                .parse()
                .map_err(|_| PeriodParseError::InvalidCount(s.to_string()))?
        };
        if !(1..=MAX_COUNT).contains(&count) {
            return Err(PeriodParseError::InvalidCount(s.to_string()));
        }

        let period = match unit {
            "m" | "min" | "mins" | "minute" | "minutes" => Self::minutes(count)?,
            "h" | "H" | "hour" | "hours" => Self::hours(count)?,
            "d" | "D" | "day" | "days" => Self::days(count)?,
            "w" | "W" | "week" | "weeks" => {
                if count != 1 {
                    return Err(PeriodParseError::UnsupportedMultiple(s.to_string()));
                }
                Self::Week
            }
            "M" | "month" | "months" => {
                if count != 1 {
                    return Err(PeriodParseError::UnsupportedMultiple(s.to_string()));
                }
                Self::Month
            }
            _ => return Err(PeriodParseError::UnknownUnit(s.to_string())),
        };

        Ok(period)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(span) => {
                let minutes = span.0.num_minutes();
                if minutes % (60 * 24) == 0 {
                    write!(f, "{}d", minutes / (60 * 24))
                } else if minutes % 60 == 0 {
                    write!(f, "{}h", minutes / 60)
                } else {
                    write!(f, "{minutes}m")
                }
            }
            Self::Week => write!(f, "1w"),
            Self::Month => write!(f, "1M"),
        }
    }
}

// ---------------------------------------------------------------------------
// Bars
// ---------------------------------------------------------------------------

/// One aggregated bar per non-empty bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub period_start: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    fn start(period_start: DateTime<Utc>, c: &Candle) -> Self {
        Self {
            period_start,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: summable_volume(c),
        }
    }

    fn absorb(&mut self, c: &Candle) {
        if self.open.is_nan() {
            self.open = c.open;
        }
        self.high = self.high.max(c.high);
        self.low = self.low.min(c.low);
        if !c.close.is_nan() {
            self.close = c.close;
        }
        self.volume += summable_volume(c);
    }
}

fn summable_volume(c: &Candle) -> f64 {
    c.volume.filter(|v| !v.is_nan()).unwrap_or(0.0)
}

/// A bar re-enters the indicator engine as a candle stamped at its bucket
/// start.
impl From<Bar> for Candle {
    fn from(bar: Bar) -> Self {
        Candle::new(bar.period_start, bar.open, bar.high, bar.low, bar.close, Some(bar.volume))
    }
}

/// Resampler behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResampleOptions {
    #[serde(default)]
    pub strict: bool,
}

/// Aggregate `candles` into `period` buckets (permissive mode).
///
/// Rows are put in time order first (stable, so rows sharing a timestamp keep
/// their input order).  Empty input gives empty output.
pub fn resample(candles: &[Candle], period: Period) -> Vec<Bar> {
    let Some(origin) = candles.iter().map(|c| midnight(c.open_time)).min() else {
        return Vec::new();
    };

    let mut rows = candles.to_vec();
    sort_by_open_time(&mut rows);

    let mut buckets: BTreeMap<DateTime<Utc>, Bar> = BTreeMap::new();
    for c in &rows {
        let start = period.bucket_start(c.open_time, origin);
        buckets
            .entry(start)
            .and_modify(|bar| bar.absorb(c))
            .or_insert_with(|| Bar::start(start, c));
    }

    debug!(
        rows = candles.len(),
        bars = buckets.len(),
        period = %period,
        "series resampled"
    );
    buckets.into_values().collect()
}

/// Aggregate with options; only fails in strict mode.
pub fn resample_with(
    candles: &[Candle],
    period: Period,
    options: ResampleOptions,
) -> Result<Vec<Bar>, ValidationError> {
    if options.strict {
        validate_series(candles)?;
    }
    Ok(resample(candles, period))
}
