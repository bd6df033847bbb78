// =============================================================================
// candle-lens: Main Entry Point
// =============================================================================
//
// Config precedence: defaults < --config file < CANDLE_LENS_* env < CLI flags.
// =============================================================================

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use candle_lens::cli::Cli;
use candle_lens::pipeline;
use candle_lens::runtime_config::ReportConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // ── 2. Config ───────────────────────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) if path.exists() => ReportConfig::load(path)?,
        Some(path) => {
            warn!(path = %path.display(), "config file not found, using defaults");
            ReportConfig::default()
        }
        None => ReportConfig::default(),
    };
    config.apply_env_overrides();
    cli.apply_to(&mut config);

    if let Some(path) = &cli.save_config {
        config
            .save(path)
            .with_context(|| format!("failed to save merged config to {}", path.display()))?;
        info!(path = %path.display(), "merged config written");
        return Ok(());
    }

    // ── 3. Run ──────────────────────────────────────────────────────────
    match pipeline::run_report(config).await {
        Ok(output) => {
            info!(
                datasets = output.datasets,
                sheets = output.sheets.len(),
                dir = %output.workbook_dir.display(),
                "report saved"
            );
            println!("Saved: {}", output.workbook_dir.display());
            if let Some(html) = output.dashboard {
                println!("HTML dashboard: {}", html.display());
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "report run failed");
            Err(e)
        }
    }
}
