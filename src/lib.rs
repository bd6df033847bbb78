// =============================================================================
// candle-lens: OHLCV history enriched with technical indicators
// =============================================================================
//
// Core (pure, synchronous):  market_data, indicators, resample
// Collaborators (I/O):       exchange, export, pipeline
// Ambient:                   runtime_config, cli, types
// =============================================================================

pub mod cli;
pub mod exchange;
pub mod export;
pub mod indicators;
pub mod market_data;
pub mod pipeline;
pub mod resample;
pub mod runtime_config;
pub mod types;
