// =============================================================================
// Sheets: one CSV per named table inside the report directory
// =============================================================================
//
// Cell conventions:
//   times    "YYYY-MM-DD HH:MM:SS" (UTC)
//   numbers  shortest round-trip form; NaN and missing values are empty cells
//   flags    "true" / "false"
//
// Sheets of fetched series append the provider's own fields (DETAIL_COLUMNS)
// after the indicator columns; resampled sheets carry the indicator columns
// only.
//
// Sheet names are capped at 31 characters and characters that spreadsheet
// tools reject in sheet names are replaced with '_'.  Sheets with no rows are
// not written.
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::exchange::DetailMap;
use crate::indicators::{EnrichedSeries, IndicatorRow, COLUMNS};

pub const MAX_SHEET_NAME: usize = 31;

/// Provider columns appended to the sheet of a fetched series.
pub const DETAIL_COLUMNS: &[&str] = &[
    "symbol",
    "close_time",
    "trades",
    "quote_asset_volume",
    "taker_base",
    "taker_quote",
];

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SUMMARY_COLUMNS: &[&str] = &[
    "series",
    "time",
    "close",
    "rsi_14",
    "mfi_14",
    "macd",
    "macd_signal",
    "flag_overbought",
    "flag_oversold",
    "atr_14",
    "obv",
];

/// A named table of pre-formatted cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, header: &[&str]) -> Self {
        Self {
            name: name.into(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every indicator column, one row per enriched candle.
    pub fn from_series(name: impl Into<String>, series: &EnrichedSeries) -> Self {
        let mut sheet = Self::new(name, COLUMNS);
        sheet.rows = series.iter().map(series_row).collect();
        sheet
    }

    /// `from_series` plus `DETAIL_COLUMNS`.  Rows with no entry in `details`
    /// get empty detail cells apart from `symbol`.
    pub fn from_fetched(
        name: impl Into<String>,
        symbol: &str,
        series: &EnrichedSeries,
        details: &DetailMap,
    ) -> Self {
        let mut sheet = Self::from_series(name, series);
        sheet.header.extend(DETAIL_COLUMNS.iter().map(|c| c.to_string()));
        for (row, r) in sheet.rows.iter_mut().zip(series) {
            let d = details.get(&r.candle.open_time).copied().unwrap_or_default();
            row.extend([
                symbol.to_string(),
                d.close_time.map(fmt_time).unwrap_or_default(),
                d.trades.map(|t| t.to_string()).unwrap_or_default(),
                fmt_opt(d.quote_asset_volume),
                fmt_opt(d.taker_base),
                fmt_opt(d.taker_quote),
            ]);
        }
        sheet
    }

    /// Sheet name as written: illegal characters replaced, at most 31 chars.
    pub fn file_stem(&self) -> String {
        self.name
            .chars()
            .map(|c| match c {
                '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
                c => c,
            })
            .take(MAX_SHEET_NAME)
            .collect()
    }
}

/// Last row of every non-empty series, in the order given.
pub fn summary_sheet<'a>(series: impl IntoIterator<Item = (&'a str, &'a EnrichedSeries)>) -> Sheet {
    let mut sheet = Sheet::new("summary", SUMMARY_COLUMNS);
    for (name, rows) in series {
        let Some(last) = rows.last() else {
            continue;
        };
        sheet.rows.push(vec![
            name.to_string(),
            fmt_time(last.candle.open_time),
            fmt_num(last.candle.close),
            fmt_opt(last.rsi_14),
            fmt_opt(last.mfi_14),
            fmt_opt(last.macd),
            fmt_opt(last.macd_signal),
            last.flag_overbought.to_string(),
            last.flag_oversold.to_string(),
            fmt_opt(last.atr_14),
            fmt_opt(last.obv),
        ]);
    }
    sheet
}

/// Write every non-empty sheet as `<dir>/<sheet>.csv`, creating `dir`.
/// Returns the paths written, in order.
pub fn write_workbook(dir: impl AsRef<Path>, sheets: &[Sheet]) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create report directory {}", dir.display()))?;

    let mut written = Vec::new();
    for sheet in sheets {
        if sheet.is_empty() {
            debug!(sheet = %sheet.name, "skipping empty sheet");
            continue;
        }
        let path = dir.join(format!("{}.csv", sheet.file_stem()));
        write_sheet(&path, sheet)?;
        written.push(path);
    }

    info!(dir = %dir.display(), sheets = written.len(), "workbook written");
    Ok(written)
}

fn write_sheet(path: &Path, sheet: &Sheet) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    writer
        .write_record(&sheet.header)
        .with_context(|| format!("failed to write header of {}", path.display()))?;
    for row in &sheet.rows {
        writer
            .write_record(row)
            .with_context(|| format!("failed to write row of {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;

    debug!(path = %path.display(), rows = sheet.rows.len(), "sheet written");
    Ok(())
}

fn series_row(r: &IndicatorRow) -> Vec<String> {
    let c = &r.candle;
    vec![
        fmt_time(c.open_time),
        fmt_num(c.open),
        fmt_num(c.high),
        fmt_num(c.low),
        fmt_num(c.close),
        fmt_opt(c.volume),
        fmt_opt(r.rsi_14),
        fmt_opt(r.macd),
        fmt_opt(r.macd_signal),
        fmt_opt(r.macd_hist),
        fmt_opt(r.bb_mid_20),
        fmt_opt(r.bb_up_20_2),
        fmt_opt(r.bb_lo_20_2),
        fmt_opt(r.atr_14),
        fmt_opt(r.obv),
        fmt_opt(r.mfi_14),
        r.flag_overbought.to_string(),
        r.flag_oversold.to_string(),
    ]
}

fn fmt_time(t: DateTime<Utc>) -> String {
    t.format(TIME_FORMAT).to_string()
}

fn fmt_num(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(fmt_num).unwrap_or_default()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::KlineDetails;
    use crate::indicators::compute;
    use crate::market_data::Candle;
    use chrono::{Duration, TimeZone};

    fn series(n: usize) -> EnrichedSeries {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candles: Vec<Candle> = (0..n)
            .map(|i| {
                let c = 100.0 + i as f64;
                Candle::new(t0 + Duration::hours(i as i64), c, c + 1.0, c - 1.0, c, Some(2.0))
            })
            .collect();
        compute(&candles)
    }

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("candle_lens_{tag}_{}", std::process::id()))
    }

    #[test]
    fn series_sheet_uses_column_contract() {
        let sheet = Sheet::from_series("spot_1h", &series(3));
        assert_eq!(sheet.header, COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>());
        assert_eq!(sheet.rows.len(), 3);
        assert!(sheet.rows.iter().all(|r| r.len() == COLUMNS.len()));
        assert_eq!(sheet.rows[0][0], "2024-01-01 00:00:00");
        // Bollinger is still warming up: empty cell, not "None" or "NaN".
        assert_eq!(sheet.rows[0][10], "");
    }

    #[test]
    fn fetched_sheet_appends_provider_columns() {
        let rows = series(2);
        let t0 = rows[0].candle.open_time;
        let mut details = DetailMap::new();
        details.insert(
            t0,
            KlineDetails {
                close_time: Some(t0 + Duration::hours(1) - Duration::milliseconds(1)),
                trades: Some(42),
                quote_asset_volume: Some(1050.0),
                taker_base: Some(5.0),
                taker_quote: Some(f64::NAN),
            },
        );

        let sheet = Sheet::from_fetched("spot_1h", "BTCUSDT", &rows, &details);
        assert_eq!(sheet.header.len(), COLUMNS.len() + DETAIL_COLUMNS.len());
        assert_eq!(sheet.header[COLUMNS.len()], "symbol");

        let extra = &sheet.rows[0][COLUMNS.len()..];
        assert_eq!(extra, ["BTCUSDT", "2024-01-01 00:59:59", "42", "1050", "5", ""]);
        // No details for the second row: only the symbol is filled.
        let extra = &sheet.rows[1][COLUMNS.len()..];
        assert_eq!(extra, ["BTCUSDT", "", "", "", "", ""]);
    }

    #[test]
    fn long_names_are_truncated_and_sanitised() {
        let sheet = Sheet::new("futures_BTCUSDT_FUT_PERP_1h_to_1w_extra", &["a"]);
        assert_eq!(sheet.file_stem().chars().count(), MAX_SHEET_NAME);
        assert_eq!(Sheet::new("a/b:c", &["a"]).file_stem(), "a_b_c");
    }

    #[test]
    fn summary_takes_last_row_and_skips_empty_series() {
        let full = series(30);
        let empty: EnrichedSeries = Vec::new();
        let sheet = summary_sheet([("spot_1h", &full), ("futures_1h", &empty)]);

        assert_eq!(sheet.rows.len(), 1);
        let row = &sheet.rows[0];
        assert_eq!(row.len(), SUMMARY_COLUMNS.len());
        assert_eq!(row[0], "spot_1h");
        assert_eq!(row[1], "2024-01-02 05:00:00");
        assert_eq!(row[2], "129");
    }

    #[test]
    fn missing_values_render_as_empty_cells() {
        assert_eq!(fmt_opt(None), "");
        assert_eq!(fmt_num(f64::NAN), "");
        assert_eq!(fmt_num(1.5), "1.5");
    }

    #[test]
    fn workbook_skips_empty_sheets() {
        let dir = temp_dir("workbook");
        let sheets = vec![
            Sheet::from_series("spot_1h", &series(5)),
            Sheet::from_series("futures_1h", &Vec::new()),
        ];
        let written = write_workbook(&dir, &sheets).unwrap();

        assert_eq!(written, vec![dir.join("spot_1h.csv")]);
        let text = std::fs::read_to_string(&written[0]).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), COLUMNS.join(","));
        assert_eq!(lines.count(), 5);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
