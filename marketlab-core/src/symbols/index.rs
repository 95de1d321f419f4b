//! Fixed mapping from market index to its public constituents page.

use super::parser::TableSignature;
use crate::data::DataError;
use crate::domain::MarketIndex;

/// Where an index's members are published and how the table is laid out.
#[derive(Debug, Clone, Copy)]
pub struct IndexSource {
    pub url: &'static str,
    pub signature: TableSignature,
    /// Listing exchange for rows that do not carry one.
    pub default_exchange: Option<&'static str>,
}

const GICS_SECTOR: &[&str] = &["GICS Sector", "Sector"];
const GICS_SUB_INDUSTRY: &[&str] = &["GICS Sub-Industry", "Sub-Industry"];

static NASDAQ_100: IndexSource = IndexSource {
    url: "https://en.wikipedia.org/wiki/Nasdaq-100",
    signature: TableSignature {
        symbol: &["Ticker", "Symbol"],
        name: &["Company", "Security"],
        sector: GICS_SECTOR,
        sub_industry: GICS_SUB_INDUSTRY,
        exchange: &[],
    },
    default_exchange: Some("NASDAQ"),
};

static SP_500: IndexSource = IndexSource {
    url: "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies",
    signature: TableSignature {
        symbol: &["Symbol", "Ticker"],
        name: &["Security", "Company"],
        sector: GICS_SECTOR,
        sub_industry: GICS_SUB_INDUSTRY,
        exchange: &[],
    },
    default_exchange: None,
};

static DOW_JONES: IndexSource = IndexSource {
    url: "https://en.wikipedia.org/wiki/Dow_Jones_Industrial_Average",
    signature: TableSignature {
        symbol: &["Symbol", "Ticker"],
        name: &["Company"],
        sector: &["Industry", "Sector"],
        sub_industry: &[],
        exchange: &["Exchange"],
    },
    default_exchange: None,
};

static RUSSELL_1000: IndexSource = IndexSource {
    url: "https://en.wikipedia.org/wiki/Russell_1000_Index",
    signature: TableSignature {
        symbol: &["Symbol", "Ticker"],
        name: &["Company", "Security"],
        sector: GICS_SECTOR,
        sub_industry: GICS_SUB_INDUSTRY,
        exchange: &[],
    },
    default_exchange: None,
};

/// Resolve the source for `index`. Indexes without a public table fail closed.
pub fn source(index: MarketIndex) -> Result<&'static IndexSource, DataError> {
    match index {
        MarketIndex::Nasdaq100 => Ok(&NASDAQ_100),
        MarketIndex::Sp500 => Ok(&SP_500),
        MarketIndex::DowJones => Ok(&DOW_JONES),
        MarketIndex::Russell1000 => Ok(&RUSSELL_1000),
        MarketIndex::Russell2000 => Err(DataError::UnsupportedIndex(format!(
            "{} has no public constituents table",
            index.display_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mapped_index_has_an_https_source() {
        for index in MarketIndex::ALL {
            if let Ok(src) = source(index) {
                assert!(src.url.starts_with("https://"), "{index}");
                assert!(!src.signature.symbol.is_empty());
                assert!(!src.signature.name.is_empty());
            }
        }
    }

    #[test]
    fn russell_2000_fails_closed() {
        let err = source(MarketIndex::Russell2000).unwrap_err();
        assert!(matches!(err, DataError::UnsupportedIndex(_)));
    }
}
