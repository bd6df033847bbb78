// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators the report
// computes.  Every column function returns a vector aligned with its input
// series; rows without enough history are `None` rather than an error.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod engine;
pub mod macd;
pub mod mfi;
pub mod obv;
pub mod rolling;
pub mod rsi;

pub use engine::{compute, EngineOptions, EnrichedSeries, IndicatorEngine, IndicatorRow};

/// Additive guard in the RS and MFR denominators.
pub const EPSILON: f64 = 1e-12;

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BB_PERIOD: usize = 20;
pub const BB_NUM_STD: f64 = 2.0;
pub const ATR_PERIOD: usize = 14;
pub const MFI_PERIOD: usize = 14;

pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const RSI_OVERSOLD: f64 = 30.0;
pub const MFI_OVERBOUGHT: f64 = 80.0;
pub const MFI_OVERSOLD: f64 = 20.0;

/// Column names of an enriched row, in export order.
///
/// Downstream exports and dashboards key on these names, so they must stay
/// stable.
pub const COLUMNS: &[&str] = &[
    "open_time",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "rsi_14",
    "macd",
    "macd_signal",
    "macd_hist",
    "bb_mid_20",
    "bb_up_20_2",
    "bb_lo_20_2",
    "atr_14",
    "obv",
    "mfi_14",
    "flag_overbought",
    "flag_oversold",
];
