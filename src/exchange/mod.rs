// =============================================================================
// Market-data retrieval
// =============================================================================
//
// Everything the report needs to turn "symbol + interval + date range" into a
// numeric candle series.  Endpoint URLs, page sizes and politeness delays live
// in `ExchangeEndpoints`, which is part of the report config and is passed into
// the client explicitly.
// =============================================================================

pub mod binance;
pub mod coingecko;
pub mod rate_limit;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::market_data::Candle;
use rate_limit::RateLimitTracker;

/// Intervals accepted by the kline endpoints.
pub const SUPPORTED_INTERVALS: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

/// Typed failures of the fetch layer that callers may want to match on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unsupported interval: {0}")]
    UnsupportedInterval(String),

    #[error("cannot parse time '{0}' (expected epoch millis, YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or RFC 3339)")]
    InvalidTime(String),

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
        body: String,
    },
}

// =============================================================================
// Endpoint configuration
// =============================================================================

fn default_binance_spot() -> String {
    "https://api.binance.com".to_string()
}

fn default_binance_futures() -> String {
    "https://fapi.binance.com".to_string()
}

fn default_coingecko() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_page_limit() -> u32 {
    1000
}

fn default_page_delay_ms() -> u64 {
    200
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_coingecko_days() -> u32 {
    730
}

/// Base URLs and paging knobs for every provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeEndpoints {
    #[serde(default = "default_binance_spot")]
    pub binance_spot: String,

    #[serde(default = "default_binance_futures")]
    pub binance_futures: String,

    #[serde(default = "default_coingecko")]
    pub coingecko: String,

    /// Rows requested per kline page (spot caps at 1000, futures at 1500).
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Pause between consecutive pages.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// History requested from CoinGecko, which has no date-range parameter.
    #[serde(default = "default_coingecko_days")]
    pub coingecko_days: u32,
}

impl Default for ExchangeEndpoints {
    fn default() -> Self {
        Self {
            binance_spot: default_binance_spot(),
            binance_futures: default_binance_futures(),
            coingecko: default_coingecko(),
            page_limit: default_page_limit(),
            page_delay_ms: default_page_delay_ms(),
            timeout_secs: default_timeout_secs(),
            coingecko_days: default_coingecko_days(),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// Provider fields beyond OHLCV for one row.  Binance fills all of them;
/// CoinGecko only has a close time, equal to the open time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KlineDetails {
    pub close_time: Option<DateTime<Utc>>,
    pub trades: Option<u64>,
    pub quote_asset_volume: Option<f64>,
    pub taker_base: Option<f64>,
    pub taker_quote: Option<f64>,
}

/// Row details keyed by candle open time.
pub type DetailMap = BTreeMap<DateTime<Utc>, KlineDetails>;

/// A fetched series plus the name the provider knows it by.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSeries {
    pub name: String,
    pub candles: Vec<Candle>,
    pub details: DetailMap,
}

/// HTTP client shared by every fetch task.  Cheap to clone.
#[derive(Debug, Clone)]
pub struct MarketDataClient {
    client: reqwest::Client,
    endpoints: ExchangeEndpoints,
    rate_limit: Arc<RateLimitTracker>,
}

impl MarketDataClient {
    pub fn new(endpoints: ExchangeEndpoints) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(endpoints.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoints,
            rate_limit: Arc::new(RateLimitTracker::new()),
        })
    }

    pub fn endpoints(&self) -> &ExchangeEndpoints {
        &self.endpoints
    }

    pub fn rate_limit(&self) -> &RateLimitTracker {
        &self.rate_limit
    }

    /// GET `url` with `query` and decode the JSON body, failing on non-2xx.
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {url} request failed"))?;

        self.rate_limit.update_from_headers(resp.headers());

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                endpoint: url.to_string(),
                status,
                body,
            }
            .into());
        }

        resp.json()
            .await
            .with_context(|| format!("failed to parse response from {url}"))
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub fn check_interval(interval: &str) -> Result<(), FetchError> {
    if SUPPORTED_INTERVALS.contains(&interval) {
        Ok(())
    } else {
        Err(FetchError::UnsupportedInterval(interval.to_string()))
    }
}

/// Parse a start/end bound into epoch milliseconds.  Times without an offset
/// are taken as UTC.
pub fn parse_time_ms(input: &str) -> Result<i64, FetchError> {
    let s = input.trim();

    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return s
            .parse::<i64>()
            .map_err(|_| FetchError::InvalidTime(input.to_string()));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc().timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.and_utc().timestamp_millis());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d.and_time(NaiveTime::MIN).and_utc().timestamp_millis());
    }

    Err(FetchError::InvalidTime(input.to_string()))
}

/// Providers send numbers either as JSON strings or JSON numbers.
pub(crate) fn parse_str_f64(val: &serde_json::Value, name: &str) -> Result<f64> {
    match val {
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .with_context(|| format!("failed to parse {name} as f64: {s}")),
        serde_json::Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("field {name} is not a valid f64")),
        _ => anyhow::bail!("field {name} has unexpected JSON type: {val}"),
    }
}

/// Like `parse_str_f64`, but a value that does not parse becomes NaN with a
/// warning instead of an error.
pub(crate) fn coerce_f64(val: &serde_json::Value, name: &str) -> f64 {
    parse_str_f64(val, name).unwrap_or_else(|e| {
        warn!(field = name, error = %e, "unparseable value, using NaN");
        f64::NAN
    })
}
