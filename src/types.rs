// =============================================================================
// Shared types used across the report pipeline
// =============================================================================

use serde::{Deserialize, Serialize};

/// Market-data provider for the spot series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Binance,
    Coingecko,
}

impl Default for Exchange {
    fn default() -> Self {
        Self::Binance
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binance => write!(f, "binance"),
            Self::Coingecko => write!(f, "coingecko"),
        }
    }
}

/// Which market a series was fetched from.  Also the prefix of its sheet name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Spot,
    Futures,
}

impl std::fmt::Display for MarketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spot => write!(f, "spot"),
            Self::Futures => write!(f, "futures"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&Exchange::Coingecko).unwrap(), "\"coingecko\"");
        let e: Exchange = serde_json::from_str("\"binance\"").unwrap();
        assert_eq!(e, Exchange::Binance);
    }

    #[test]
    fn market_type_display_matches_sheet_prefix() {
        assert_eq!(format!("{}_{}", MarketType::Spot, "1h"), "spot_1h");
        assert_eq!(MarketType::Futures.to_string(), "futures");
    }
}
