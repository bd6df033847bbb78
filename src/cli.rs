// =============================================================================
// Command line
// =============================================================================
//
// Every flag is optional.  A flag that is not passed leaves the value from the
// config file (or the built-in default) untouched, so explicit flags always
// win over the file.
// =============================================================================

use std::path::PathBuf;

use clap::Parser;

use crate::runtime_config::ReportConfig;
use crate::types::Exchange;

#[derive(Debug, Parser)]
#[command(name = "candle-lens")]
#[command(about = "Fetch OHLCV history, enrich it with technical indicators and export a report", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Base asset (coin id when --exchange coingecko)
    #[arg(long)]
    pub symbol: Option<String>,

    /// Quote asset
    #[arg(long)]
    pub quote: Option<String>,

    /// Intervals to fetch, e.g. --timeframes 1h 4h 1d
    #[arg(long, num_args = 1..)]
    pub timeframes: Option<Vec<String>>,

    /// Start of history: YYYY-MM-DD, RFC 3339 or epoch millis
    #[arg(long)]
    pub start: Option<String>,

    /// End of history (defaults to now)
    #[arg(long)]
    pub end: Option<String>,

    /// Provider for the spot series
    #[arg(long, value_enum)]
    pub exchange: Option<Exchange>,

    /// Skip the spot series
    #[arg(long)]
    pub no_spot: bool,

    /// Skip the perpetual futures series
    #[arg(long)]
    pub no_futures: bool,

    /// Output directory
    #[arg(long)]
    pub out_dir: Option<String>,

    /// Skip the HTML dashboard
    #[arg(long)]
    pub no_html: bool,

    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Extra periods derived from the first timeframe, e.g. --resample 1w 1M
    #[arg(long, num_args = 1..)]
    pub resample: Option<Vec<String>>,

    /// Refuse malformed series instead of computing through them
    #[arg(long)]
    pub strict: bool,

    /// Write the merged config to this path and exit
    #[arg(long)]
    pub save_config: Option<PathBuf>,
}

impl Cli {
    /// Overlay the flags that were actually passed onto `cfg`.
    pub fn apply_to(&self, cfg: &mut ReportConfig) {
        if let Some(symbol) = &self.symbol {
            cfg.symbol = symbol.clone();
        }
        if let Some(quote) = &self.quote {
            cfg.quote = quote.clone();
        }
        if let Some(timeframes) = &self.timeframes {
            cfg.timeframes = timeframes.clone();
        }
        if let Some(start) = &self.start {
            cfg.start = start.clone();
        }
        if let Some(end) = &self.end {
            cfg.end = Some(end.clone());
        }
        if let Some(exchange) = self.exchange {
            cfg.exchange = exchange;
        }
        if self.no_spot {
            cfg.fetch_spot = false;
        }
        if self.no_futures {
            cfg.fetch_futures = false;
        }
        if let Some(out_dir) = &self.out_dir {
            cfg.out_dir = out_dir.clone();
        }
        if self.no_html {
            cfg.generate_html = false;
        }
        if let Some(resample) = &self.resample {
            cfg.resample = resample.clone();
        }
        if self.strict {
            cfg.strict_validation = true;
        }
    }
}
