// =============================================================================
// Report Configuration: what to fetch, how to enrich it, where to write it
// =============================================================================
//
// Persistence uses an atomic tmp + rename pattern so a crash never leaves a
// half-written file behind.  All fields carry a serde default so that a
// partial config file (or `{}`) loads cleanly.
//
// Precedence when the binary assembles its config:
//   defaults < config file < environment (CANDLE_LENS_*) < explicit CLI flags
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::exchange::{check_interval, parse_time_ms, ExchangeEndpoints};
use crate::resample::Period;
use crate::types::Exchange;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_symbol() -> String {
    "BTC".to_string()
}

fn default_quote() -> String {
    "USDT".to_string()
}

fn default_timeframes() -> Vec<String> {
    vec!["1h".to_string(), "4h".to_string(), "1d".to_string()]
}

fn default_start() -> String {
    "2024-01-01".to_string()
}

fn default_out_dir() -> String {
    "out".to_string()
}

// =============================================================================
// ReportConfig
// =============================================================================

/// Everything one report run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Base asset, e.g. "BTC".  For CoinGecko this is the coin id.
    #[serde(default = "default_symbol")]
    pub symbol: String,

    #[serde(default = "default_quote")]
    pub quote: String,

    /// Exchange intervals to fetch, in order.
    #[serde(default = "default_timeframes")]
    pub timeframes: Vec<String>,

    /// Inclusive start of the history window.
    #[serde(default = "default_start")]
    pub start: String,

    #[serde(default)]
    pub end: Option<String>,

    /// Provider for the spot series.  Futures always come from Binance.
    #[serde(default)]
    pub exchange: Exchange,

    #[serde(default = "default_true")]
    pub fetch_spot: bool,

    #[serde(default = "default_true")]
    pub fetch_futures: bool,

    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    #[serde(default = "default_true")]
    pub generate_html: bool,

    /// Coarser periods ("4h", "1d", "1w", ...) derived locally from the
    /// first timeframe's series.
    #[serde(default)]
    pub resample: Vec<String>,

    /// Refuse malformed series instead of computing through them.
    #[serde(default)]
    pub strict_validation: bool,

    #[serde(default)]
    pub endpoints: ExchangeEndpoints,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            quote: default_quote(),
            timeframes: default_timeframes(),
            start: default_start(),
            end: None,
            exchange: Exchange::default(),
            fetch_spot: true,
            fetch_futures: true,
            out_dir: default_out_dir(),
            generate_html: true,
            resample: Vec::new(),
            strict_validation: false,
            endpoints: ExchangeEndpoints::default(),
        }
    }
}

impl ReportConfig {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse report config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbol = %config.symbol,
            timeframes = ?config.timeframes,
            "report config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise report config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "report config saved (atomic)");
        Ok(())
    }

    /// Apply `CANDLE_LENS_SYMBOL`, `CANDLE_LENS_QUOTE` and
    /// `CANDLE_LENS_OUT_DIR` when set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let pick = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(symbol) = pick("CANDLE_LENS_SYMBOL") {
            self.symbol = symbol;
        }
        if let Some(quote) = pick("CANDLE_LENS_QUOTE") {
            self.quote = quote;
        }
        if let Some(out_dir) = pick("CANDLE_LENS_OUT_DIR") {
            self.out_dir = out_dir;
        }
    }

    /// Parsed `resample` periods.
    pub fn resample_periods(&self) -> Result<Vec<Period>> {
        self.resample
            .iter()
            .map(|p| {
                p.parse::<Period>()
                    .with_context(|| format!("invalid resample period '{p}'"))
            })
            .collect()
    }

    /// `start`/`end` as epoch milliseconds.  An empty `start` means "from the
    /// beginning of the provider's history".
    pub fn time_range_ms(&self) -> Result<(Option<i64>, Option<i64>)> {
        let start = match self.start.trim() {
            "" => None,
            s => Some(parse_time_ms(s).context("invalid start")?),
        };
        let end = match self.end.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(parse_time_ms(s).context("invalid end")?),
        };
        if let (Some(s), Some(e)) = (start, end) {
            anyhow::ensure!(s <= e, "start {s} is after end {e} (epoch ms)");
        }
        Ok((start, end))
    }

    /// Reject configurations that cannot produce a report before any
    /// network traffic happens.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.symbol.trim().is_empty(), "symbol must not be empty");
        anyhow::ensure!(!self.quote.trim().is_empty(), "quote must not be empty");
        anyhow::ensure!(!self.timeframes.is_empty(), "at least one timeframe is required");
        for tf in &self.timeframes {
            check_interval(tf)?;
        }
        self.resample_periods()?;
        self.time_range_ms()?;

        if !self.fetch_spot && !self.fetch_futures {
            warn!("both spot and futures fetching are disabled; the report will be empty");
        }
        if !self.resample.is_empty() && !self.fetch_spot && !self.fetch_futures {
            warn!("resample periods configured but no series will be fetched");
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = ReportConfig::default();
        assert_eq!(cfg.symbol, "BTC");
        assert_eq!(cfg.quote, "USDT");
        assert_eq!(cfg.timeframes, vec!["1h", "4h", "1d"]);
        assert_eq!(cfg.start, "2024-01-01");
        assert!(cfg.end.is_none());
        assert_eq!(cfg.exchange, Exchange::Binance);
        assert!(cfg.fetch_spot && cfg.fetch_futures && cfg.generate_html);
        assert!(!cfg.strict_validation);
        assert!(cfg.resample.is_empty());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: ReportConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, ReportConfig::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "symbol": "ETH", "exchange": "coingecko", "fetch_futures": false,
                        "endpoints": { "page_delay_ms": 0 } }"#;
        let cfg: ReportConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.symbol, "ETH");
        assert_eq!(cfg.exchange, Exchange::Coingecko);
        assert!(!cfg.fetch_futures);
        assert!(cfg.fetch_spot);
        assert_eq!(cfg.endpoints.page_delay_ms, 0);
        assert_eq!(cfg.endpoints.binance_futures, "https://fapi.binance.com");
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("candle_lens_cfg_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.json");

        let mut cfg = ReportConfig::default();
        cfg.symbol = "SOL".into();
        cfg.resample = vec!["1w".into()];
        cfg.save(&path).unwrap();

        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(ReportConfig::load(&path).unwrap(), cfg);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let err = ReportConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("failed to read report config"));
    }

    #[test]
    fn overrides_apply_only_when_non_empty() {
        let env: HashMap<&str, &str> =
            HashMap::from([("CANDLE_LENS_SYMBOL", "ETH"), ("CANDLE_LENS_OUT_DIR", "  ")]);
        let mut cfg = ReportConfig::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.symbol, "ETH");
        assert_eq!(cfg.out_dir, "out");
        assert_eq!(cfg.quote, "USDT");
    }

    #[test]
    fn validate_rejects_bad_inputs() {
        assert!(ReportConfig::default().validate().is_ok());

        let mut cfg = ReportConfig::default();
        cfg.timeframes = vec!["7h".into()];
        assert!(cfg.validate().is_err());

        let mut cfg = ReportConfig::default();
        cfg.resample = vec!["fortnight".into()];
        assert!(cfg.validate().is_err());

        let mut cfg = ReportConfig::default();
        cfg.end = Some("2023-01-01".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn time_range_parses_bounds() {
        let mut cfg = ReportConfig::default();
        cfg.end = Some("2024-01-02".into());
        let (start, end) = cfg.time_range_ms().unwrap();
        assert_eq!(start, Some(1_704_067_200_000));
        assert_eq!(end, Some(1_704_153_600_000));

        cfg.start = String::new();
        assert_eq!(cfg.time_range_ms().unwrap().0, None);
    }
}
