// =============================================================================
// Report pipeline: fetch -> enrich -> (resample) -> export
// =============================================================================
//
// One tokio task per (market, timeframe).  Each task fetches its series and
// runs the indicator engine on it; the main task joins them all, derives any
// resampled datasets from the first timeframe, then writes the sheets and the
// dashboard.
//
// A failed task is logged and its dataset left out.  The run only fails when
// every task failed.
// =============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::future::join_all;
use tracing::{error, info, warn};

use crate::exchange::binance::KlineRange;
use crate::exchange::{DetailMap, FetchedSeries, MarketDataClient};
use crate::export::{self, ReportPaths, Sheet};
use crate::indicators::{EngineOptions, EnrichedSeries, IndicatorEngine};
use crate::market_data::{sort_by_open_time, Candle, ValidationError};
use crate::resample::{resample_with, Period, ResampleOptions};
use crate::runtime_config::ReportConfig;
use crate::types::{Exchange, MarketType};

/// One unit of fetch work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesJob {
    pub market: MarketType,
    pub timeframe: String,
}

impl SeriesJob {
    /// Sheet / dataset key, e.g. `spot_1h`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.market, self.timeframe)
    }
}

/// An enriched dataset ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub key: String,
    /// Provider's name for the series, e.g. `BTCUSDT_FUT_PERP`.
    pub source: String,
    pub timeframe: String,
    pub series: EnrichedSeries,
    /// Provider fields per row; empty for resampled datasets.
    pub details: DetailMap,
}

impl Dataset {
    /// Fetched datasets keep the provider columns; resampled ones have none.
    pub fn to_sheet(&self) -> Sheet {
        if self.details.is_empty() {
            Sheet::from_series(self.key.clone(), &self.series)
        } else {
            Sheet::from_fetched(self.key.clone(), &self.source, &self.series, &self.details)
        }
    }
}

/// Files produced by a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutput {
    pub sheets: Vec<PathBuf>,
    pub workbook_dir: PathBuf,
    pub dashboard: Option<PathBuf>,
    pub datasets: usize,
}

/// Jobs in report order: per timeframe, spot before futures.
pub fn plan_jobs(cfg: &ReportConfig) -> Vec<SeriesJob> {
    let mut jobs = Vec::new();
    for tf in &cfg.timeframes {
        if cfg.fetch_spot {
            jobs.push(SeriesJob {
                market: MarketType::Spot,
                timeframe: tf.clone(),
            });
        }
        if cfg.fetch_futures {
            jobs.push(SeriesJob {
                market: MarketType::Futures,
                timeframe: tf.clone(),
            });
        }
    }
    jobs
}

/// Sort a fetched series by open time and enrich it.  A missing or empty
/// series passes through as empty.
pub fn prepare_series(
    candles: Option<Vec<Candle>>,
    engine: &IndicatorEngine,
) -> Result<EnrichedSeries, ValidationError> {
    let Some(mut candles) = candles.filter(|c| !c.is_empty()) else {
        return Ok(Vec::new());
    };
    sort_by_open_time(&mut candles);
    engine.compute(&candles)
}

/// Re-aggregate every dataset of `base_timeframe` into each of `periods` and
/// enrich the result.  Keys look like `spot_1h_to_1w`.
pub fn resample_datasets(
    datasets: &[Dataset],
    base_timeframe: &str,
    periods: &[Period],
    engine: &IndicatorEngine,
) -> Result<Vec<Dataset>, ValidationError> {
    let options = ResampleOptions {
        strict: engine.options().strict,
    };
    let mut out = Vec::new();
    for period in periods {
        for ds in datasets.iter().filter(|d| d.timeframe == base_timeframe) {
            if ds.series.is_empty() {
                continue;
            }
            let candles: Vec<Candle> = ds.series.iter().map(|r| r.candle).collect();
            let bars = resample_with(&candles, *period, options)?;
            let rebuilt: Vec<Candle> = bars.into_iter().map(Candle::from).collect();
            out.push(Dataset {
                key: format!("{}_to_{}", ds.key, period),
                source: ds.source.clone(),
                timeframe: period.to_string(),
                series: engine.compute(&rebuilt)?,
                details: DetailMap::new(),
            });
        }
    }
    Ok(out)
}

async fn fetch_job(
    client: &MarketDataClient,
    cfg: &ReportConfig,
    range: KlineRange,
    job: &SeriesJob,
) -> Result<FetchedSeries> {
    match (job.market, cfg.exchange) {
        (MarketType::Spot, Exchange::Coingecko) => {
            client.fetch_coingecko_ohlc(&cfg.symbol, &cfg.quote).await
        }
        (market, _) => {
            client
                .fetch_binance_klines(market, &cfg.symbol, &cfg.quote, &job.timeframe, range)
                .await
        }
    }
}

/// Fetch and enrich every planned series concurrently.  Datasets come back in
/// plan order.
pub async fn collect_datasets(
    client: &MarketDataClient,
    cfg: Arc<ReportConfig>,
    engine: IndicatorEngine,
) -> Result<Vec<Dataset>> {
    let (start_ms, end_ms) = cfg.time_range_ms()?;
    let range = KlineRange { start_ms, end_ms };
    let jobs = plan_jobs(&cfg);

    let handles: Vec<_> = jobs
        .iter()
        .cloned()
        .map(|job| {
            let client = client.clone();
            let cfg = Arc::clone(&cfg);
            tokio::spawn(async move {
                let fetched = fetch_job(&client, &cfg, range, &job).await?;
                let series = prepare_series(Some(fetched.candles), &engine)
                    .with_context(|| format!("{} failed validation", fetched.name))?;
                Ok::<_, anyhow::Error>(Dataset {
                    key: job.key(),
                    source: fetched.name,
                    timeframe: job.timeframe,
                    series,
                    details: fetched.details,
                })
            })
        })
        .collect();

    let mut datasets = Vec::new();
    let mut failures = 0usize;
    for (job, joined) in jobs.iter().zip(join_all(handles).await) {
        match joined {
            Ok(Ok(ds)) => {
                info!(dataset = %ds.key, source = %ds.source, rows = ds.series.len(), "dataset ready");
                datasets.push(ds);
            }
            Ok(Err(e)) => {
                failures += 1;
                error!(dataset = %job.key(), error = %format!("{e:#}"), "series task failed");
            }
            Err(e) => {
                failures += 1;
                error!(dataset = %job.key(), error = %e, "series task panicked");
            }
        }
    }

    if !jobs.is_empty() && failures == jobs.len() {
        anyhow::bail!("all {} series tasks failed", jobs.len());
    }
    Ok(datasets)
}

/// Run a full report for `cfg`.
pub async fn run_report(cfg: ReportConfig) -> Result<ReportOutput> {
    cfg.validate()?;
    let periods = cfg.resample_periods()?;
    let engine = IndicatorEngine::new(EngineOptions {
        strict: cfg.strict_validation,
    });
    let client = MarketDataClient::new(cfg.endpoints.clone())?;
    let cfg = Arc::new(cfg);

    info!(
        symbol = %cfg.symbol,
        quote = %cfg.quote,
        exchange = %cfg.exchange,
        timeframes = ?cfg.timeframes,
        strict = cfg.strict_validation,
        "report run starting"
    );

    let mut datasets = collect_datasets(&client, Arc::clone(&cfg), engine).await?;

    if !periods.is_empty() {
        if let Some(base) = cfg.timeframes.first() {
            let derived = resample_datasets(&datasets, base, &periods, &engine)
                .context("resampled series failed validation")?;
            info!(base = %base, derived = derived.len(), "resampled datasets built");
            datasets.extend(derived);
        }
    }

    if datasets.iter().all(|d| d.series.is_empty()) {
        warn!("no rows fetched for any series");
    }

    let paths = ReportPaths::new(&cfg.out_dir, &cfg.symbol, &cfg.quote, &export::file_stamp());

    let mut sheets: Vec<Sheet> = datasets.iter().map(Dataset::to_sheet).collect();
    sheets.push(export::summary_sheet(
        datasets.iter().map(|d| (d.key.as_str(), &d.series)),
    ));
    let written = export::write_workbook(&paths.workbook_dir, &sheets)?;

    let dashboard = if cfg.generate_html {
        let title = format!("{}/{} report", cfg.symbol.to_uppercase(), cfg.quote.to_uppercase());
        export::write_dashboard(
            &paths.dashboard,
            &title,
            datasets.iter().map(|d| (d.key.as_str(), &d.series)),
        )?;
        Some(paths.dashboard.clone())
    } else {
        None
    };

    Ok(ReportOutput {
        sheets: written,
        workbook_dir: paths.workbook_dir,
        dashboard,
        datasets: datasets.len(),
    })
}
