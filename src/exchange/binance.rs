// =============================================================================
// Binance kline history: spot (/api/v3) and USDT-M perpetual futures (/fapi/v1)
// =============================================================================
//
// Both endpoints return pages of positional arrays:
//   [open_time, open, high, low, close, volume, close_time,
//    quote_asset_volume, trades, taker_base, taker_quote, ignore]
// with prices and volumes as JSON strings.  History is walked forward from
// `startTime`; each page resumes at the previous page's last close_time + 1
// and the walk stops on an empty or short page.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use tracing::{debug, info, instrument, warn};

use super::{check_interval, coerce_f64, DetailMap, FetchedSeries, KlineDetails, MarketDataClient};
use crate::market_data::Candle;
use crate::types::MarketType;

/// Largest page the spot endpoint accepts.
const SPOT_MAX_LIMIT: u32 = 1000;
/// Largest page the futures endpoint accepts.
const FUTURES_MAX_LIMIT: u32 = 1500;
/// Suffix appended to the futures series name.
const FUTURES_SUFFIX: &str = "_FUT_PERP";

/// Exchange symbol for a base/quote pair, e.g. `btc` + `usdt` -> `BTCUSDT`.
pub fn pair_symbol(base: &str, quote: &str) -> String {
    format!("{}{}", base.to_uppercase(), quote.to_uppercase())
}

/// Time window of a kline request, epoch milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KlineRange {
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
}

impl MarketDataClient {
    /// Fetch the full kline history of `base`/`quote` at `interval` from the
    /// given Binance market, following pages until the range is exhausted.
    ///
    /// # Edge cases
    /// - Entries shorter than 7 fields or with a non-integer open time are
    ///   skipped with a warning.
    /// - An unparseable price or volume becomes NaN (logged); the rest of the
    ///   row and the fetch carry on.
    #[instrument(skip(self))]
    pub async fn fetch_binance_klines(
        &self,
        market: MarketType,
        base: &str,
        quote: &str,
        interval: &str,
        range: KlineRange,
    ) -> Result<FetchedSeries> {
        check_interval(interval)?;

        let symbol = pair_symbol(base, quote);
        let endpoints = self.endpoints();
        let (url, max_limit, name) = match market {
            MarketType::Spot => (
                format!("{}/api/v3/klines", endpoints.binance_spot),
                SPOT_MAX_LIMIT,
                symbol.clone(),
            ),
            MarketType::Futures => (
                format!("{}/fapi/v1/klines", endpoints.binance_futures),
                FUTURES_MAX_LIMIT,
                format!("{symbol}{FUTURES_SUFFIX}"),
            ),
        };
        let limit = endpoints.page_limit.clamp(1, max_limit);
        let page_delay = Duration::from_millis(endpoints.page_delay_ms);

        let mut candles = Vec::new();
        let mut details = DetailMap::new();
        let mut cursor = range.start_ms;
        let mut pages = 0u32;

        loop {
            let mut query = vec![
                ("symbol", symbol.clone()),
                ("interval", interval.to_string()),
                ("limit", limit.to_string()),
            ];
            if let Some(start) = cursor {
                query.push(("startTime", start.to_string()));
            }
            if let Some(end) = range.end_ms {
                query.push(("endTime", end.to_string()));
            }

            let body = self.get_json(&url, &query).await?;
            let raw = body
                .as_array()
                .context("klines response is not an array")?;
            pages += 1;

            if raw.is_empty() {
                break;
            }

            let mut last_close_time = None;
            for entry in raw {
                let arr = entry
                    .as_array()
                    .context("kline entry is not an array")?;

                if arr.len() < 7 {
                    warn!("skipping malformed kline entry with {} elements", arr.len());
                    continue;
                }
                let Some(open_time) = arr[0].as_i64() else {
                    warn!(value = %arr[0], "skipping kline entry with bad open time");
                    continue;
                };

                let open = coerce_f64(&arr[1], "open");
                let high = coerce_f64(&arr[2], "high");
                let low = coerce_f64(&arr[3], "low");
                let close = coerce_f64(&arr[4], "close");
                let volume = coerce_f64(&arr[5], "volume");

                let close_ms = arr[6].as_i64();
                if close_ms.is_some() {
                    last_close_time = close_ms;
                }

                let Some(candle) =
                    Candle::from_millis(open_time, open, high, low, close, Some(volume))
                else {
                    warn!(open_time, "skipping kline entry with out-of-range open time");
                    continue;
                };
                details.insert(
                    candle.open_time,
                    KlineDetails {
                        close_time: close_ms.and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
                        quote_asset_volume: arr.get(7).map(|v| coerce_f64(v, "quote_asset_volume")),
                        trades: arr.get(8).and_then(|v| v.as_u64()),
                        taker_base: arr.get(9).map(|v| coerce_f64(v, "taker_base")),
                        taker_quote: arr.get(10).map(|v| coerce_f64(v, "taker_quote")),
                    },
                );
                candles.push(candle);
            }

            debug!(symbol = %symbol, interval, page = pages, rows = raw.len(), "kline page fetched");

            if raw.len() < limit as usize {
                break;
            }
            let Some(last) = last_close_time else {
                break;
            };
            cursor = Some(last + 1);
            if range.end_ms.is_some_and(|end| last + 1 > end) {
                break;
            }

            tokio::time::sleep(page_delay + self.rate_limit().throttle_delay()).await;
        }

        info!(series = %name, interval, pages, rows = candles.len(), "klines fetched");
        Ok(FetchedSeries {
            name,
            candles,
            details,
        })
    }
}
