pub mod candle;
pub mod validation;

// Re-export the Candle struct for convenient access (e.g. `use crate::market_data::Candle`).
pub use candle::{sort_by_open_time, Candle};
pub use validation::{validate_series, ValidationError};
