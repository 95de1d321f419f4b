//! Kind of instrument a price request targets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Providers serve equities and crypto pairs from different endpoints, and
/// the two never share a cache entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    /// Listed stocks and ETFs (`AAPL`, `BRK-B`).
    #[default]
    Equity,
    /// Crypto pairs quoted in a fiat or stable currency (`BTCUSD`).
    Crypto,
}

impl AssetClass {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetClass::Equity => "equity",
            AssetClass::Crypto => "crypto",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
