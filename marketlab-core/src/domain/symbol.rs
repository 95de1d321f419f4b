//! Index membership: market indexes, symbol records and symbol tables.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Named basket of ticker symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketIndex {
    #[serde(rename = "NASDAQ_100")]
    Nasdaq100,
    #[serde(rename = "SNP_500")]
    Sp500,
    #[serde(rename = "DJI")]
    DowJones,
    #[serde(rename = "RUSSELL_1000")]
    Russell1000,
    #[serde(rename = "RUSSELL_2000")]
    Russell2000,
}

impl MarketIndex {
    pub const ALL: [MarketIndex; 5] = [
        MarketIndex::Nasdaq100,
        MarketIndex::Sp500,
        MarketIndex::DowJones,
        MarketIndex::Russell1000,
        MarketIndex::Russell2000,
    ];

    /// Identifier used in cache file names and on the command line.
    pub fn as_code(self) -> &'static str {
        match self {
            MarketIndex::Nasdaq100 => "NASDAQ_100",
            MarketIndex::Sp500 => "SNP_500",
            MarketIndex::DowJones => "DJI",
            MarketIndex::Russell1000 => "RUSSELL_1000",
            MarketIndex::Russell2000 => "RUSSELL_2000",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            MarketIndex::Nasdaq100 => "NASDAQ-100",
            MarketIndex::Sp500 => "S&P 500",
            MarketIndex::DowJones => "Dow Jones Industrial Average",
            MarketIndex::Russell1000 => "Russell 1000",
            MarketIndex::Russell2000 => "Russell 2000",
        }
    }
}

impl fmt::Display for MarketIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for MarketIndex {
    type Err = String;

    /// Accepts the code (`NASDAQ_100`) and a few common spellings (`nasdaq100`, `sp500`, `dow`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        match key.as_str() {
            "NASDAQ100" | "NDX" => Ok(MarketIndex::Nasdaq100),
            "SNP500" | "SP500" | "SPX" => Ok(MarketIndex::Sp500),
            "DJI" | "DJIA" | "DOW" | "DOWJONES" => Ok(MarketIndex::DowJones),
            "RUSSELL1000" => Ok(MarketIndex::Russell1000),
            "RUSSELL2000" => Ok(MarketIndex::Russell2000),
            _ => Err(s.to_string()),
        }
    }
}

/// One member of an index snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    /// Exchange-normalized ticker (see [`normalize_ticker`]).
    pub symbol: String,
    pub name: String,
    pub sector: Option<String>,
    pub sub_industry: Option<String>,
    pub exchange: Option<String>,
}

/// Ordered index membership as of `fetched_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    pub index: MarketIndex,
    pub fetched_at: NaiveDateTime,
    records: Vec<SymbolRecord>,
}

impl SymbolTable {
    /// Build a table, dropping any record whose symbol was already seen.
    pub fn new(index: MarketIndex, fetched_at: NaiveDateTime, records: Vec<SymbolRecord>) -> Self {
        let mut seen = HashSet::new();
        let records = records
            .into_iter()
            .filter(|r| seen.insert(r.symbol.clone()))
            .collect();
        Self {
            index,
            fetched_at,
            records,
        }
    }

    pub fn records(&self) -> &[SymbolRecord] {
        &self.records
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.symbol.as_str()).collect()
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolRecord> {
        self.records.iter().find(|r| r.symbol == symbol)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

const MAX_TICKER_LEN: usize = 10;

/// Normalize a raw ticker to the convention price providers expect.
///
/// Uppercases, strips an exchange prefix (`NYSE: MMM`), and rewrites
/// share-class separators (`BRK.B`, `BRK/B`) to `-`. Returns `None` for
/// empty or malformed tickers.
pub fn normalize_ticker(raw: &str) -> Option<String> {
    let mut ticker = raw.trim();
    if let Some((prefix, rest)) = ticker.split_once(':') {
        if prefix.chars().all(|c| c.is_ascii_alphabetic() || c == ' ') {
            ticker = rest.trim();
        }
    }

    let normalized: String = ticker
        .chars()
        .map(|c| match c {
            '.' | '/' => '-',
            other => other.to_ascii_uppercase(),
        })
        .collect();

    let well_formed = !normalized.is_empty()
        && normalized.len() <= MAX_TICKER_LEN
        && normalized.starts_with(|c: char| c.is_ascii_alphanumeric())
        && !normalized.ends_with('-')
        && normalized
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-');

    well_formed.then_some(normalized)
}
