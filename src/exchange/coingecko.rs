// =============================================================================
// CoinGecko OHLC: keyless fallback for the spot series
// =============================================================================
//
// `GET /coins/{id}/ohlc?vs_currency=..&days=..` returns `[ts, o, h, l, c]`
// rows with numeric prices.  There is no volume and no interval parameter;
// CoinGecko picks the granularity from `days`.
// =============================================================================

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use super::{coerce_f64, DetailMap, FetchedSeries, KlineDetails, MarketDataClient};
use crate::market_data::Candle;

impl MarketDataClient {
    /// Fetch OHLC candles for coin `id` priced in `vs_currency`.
    ///
    /// The series is named `<ID>_<VS>` in upper case.  Volume is `None` on
    /// every row and an unparseable price becomes NaN.
    #[instrument(skip(self))]
    pub async fn fetch_coingecko_ohlc(&self, id: &str, vs_currency: &str) -> Result<FetchedSeries> {
        let id = id.to_lowercase();
        let vs = vs_currency.to_lowercase();
        let url = format!("{}/coins/{}/ohlc", self.endpoints().coingecko, id);
        let query = [
            ("vs_currency", vs.clone()),
            ("days", self.endpoints().coingecko_days.to_string()),
        ];

        let body = self.get_json(&url, &query).await?;
        let raw = body
            .as_array()
            .context("ohlc response is not an array")?;

        let mut candles = Vec::with_capacity(raw.len());
        let mut details = DetailMap::new();
        for entry in raw {
            let arr = entry
                .as_array()
                .context("ohlc entry is not an array")?;
            if arr.len() < 5 {
                warn!("skipping malformed ohlc entry with {} elements", arr.len());
                continue;
            }
            let Some(ts) = arr[0].as_f64().map(|t| t as i64) else {
                warn!(value = %arr[0], "skipping ohlc entry with bad timestamp");
                continue;
            };

            let open = coerce_f64(&arr[1], "open");
            let high = coerce_f64(&arr[2], "high");
            let low = coerce_f64(&arr[3], "low");
            let close = coerce_f64(&arr[4], "close");

            match Candle::from_millis(ts, open, high, low, close, None) {
                Some(candle) => {
                    details.insert(
                        candle.open_time,
                        KlineDetails {
                            close_time: Some(candle.open_time),
                            ..KlineDetails::default()
                        },
                    );
                    candles.push(candle);
                }
                None => warn!(ts, "skipping ohlc entry with out-of-range timestamp"),
            }
        }

        let name = format!("{}_{}", id.to_uppercase(), vs.to_uppercase());
        info!(series = %name, rows = candles.len(), "coingecko ohlc fetched");
        Ok(FetchedSeries {
            name,
            candles,
            details,
        })
    }
}
