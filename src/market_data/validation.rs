// =============================================================================
// Strict-mode series validation
// =============================================================================
//
// The engine and resampler are permissive by default: malformed rows produce
// numerically defined (if meaningless) output.  Callers that want hard
// guarantees opt in to strict mode, which runs `validate_series` first and
// refuses the whole series on the first violation.
// =============================================================================

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::Candle;

/// First violation found in a series.  `row` is the 0-based row index.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("row {row}: open_time {current} is earlier than the previous row's {previous}")]
    NonMonotonicTime {
        row: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("row {row}: {field} is not a finite number ({value})")]
    NonFinitePrice {
        row: usize,
        field: &'static str,
        value: f64,
    },

    #[error("row {row}: OHLC envelope violated (low={low}, open={open}, close={close}, high={high})")]
    Envelope {
        row: usize,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("row {row}: volume must be finite and non-negative ({value})")]
    InvalidVolume { row: usize, value: f64 },
}

/// Check every row of `candles`.
///
/// Rules, in the order they are checked per row:
/// - `open_time` is non-decreasing.
/// - open/high/low/close are finite.
/// - `low <= min(open, close) <= max(open, close) <= high`.
/// - volume, when present, is finite and `>= 0`.
///
/// An empty series is valid.
pub fn validate_series(candles: &[Candle]) -> Result<(), ValidationError> {
    let mut previous: Option<DateTime<Utc>> = None;

    for (row, c) in candles.iter().enumerate() {
        if let Some(prev) = previous {
            if c.open_time < prev {
                return Err(ValidationError::NonMonotonicTime {
                    row,
                    previous: prev,
                    current: c.open_time,
                });
            }
        }
        previous = Some(c.open_time);

        for (field, value) in [
            ("open", c.open),
            ("high", c.high),
            ("low", c.low),
            ("close", c.close),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NonFinitePrice { row, field, value });
            }
        }

        let body_low = c.open.min(c.close);
        let body_high = c.open.max(c.close);
        if c.low > body_low || body_high > c.high {
            return Err(ValidationError::Envelope {
                row,
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
            });
        }

        if let Some(v) = c.volume {
            if !v.is_finite() || v < 0.0 {
                return Err(ValidationError::InvalidVolume { row, value: v });
            }
        }
    }

    Ok(())
}
