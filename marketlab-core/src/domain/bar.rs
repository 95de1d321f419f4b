//! PriceBar and PriceSeries: the common tabular shape every provider is
//! normalized into.

use super::interval::Interval;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single symbol at a single timestamp.
///
/// End-of-day bars carry a midnight timestamp. Intraday timestamps are the
/// wall-clock time reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// OHLC sanity: non-negative prices, high is the top of the bar, low the bottom.
    ///
    /// A bar failing this check came from the provider that way. Callers may
    /// report it but the bar is never altered.
    pub fn is_consistent(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| p.is_nan() || *p < 0.0) {
            return false;
        }
        self.high >= self.open.max(self.close).max(self.low)
            && self.low <= self.open.min(self.close).min(self.high)
    }
}

/// Ordered bars for one symbol over one interval.
///
/// Timestamps are strictly increasing; `from_bars` is the only way to build
/// a series from unordered input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub interval: Interval,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series from bars in any order.
    ///
    /// Bars are sorted by timestamp and de-duplicated; when two bars share a
    /// timestamp the one that came first in the input wins.
    pub fn from_bars(symbol: impl Into<String>, interval: Interval, mut bars: Vec<PriceBar>) -> Self {
        // stable sort keeps input order among equal timestamps
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by(|later, earlier| later.timestamp == earlier.timestamp);
        Self {
            symbol: symbol.into(),
            interval,
            bars,
        }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn into_bars(self) -> Vec<PriceBar> {
        self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.bars.first().map(|b| b.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.bars.last().map(|b| b.timestamp)
    }

    /// Indices of bars that violate the OHLC consistency rule.
    pub fn inconsistent_bars(&self) -> Vec<usize> {
        self.bars
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_consistent())
            .map(|(i, _)| i)
            .collect()
    }
}

/// Symbol → series mapping produced by a batch fetch.
///
/// Iteration follows insertion order, which the batch orchestrator keeps
/// aligned with the order of the requested symbols.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiSymbolPriceMap {
    entries: Vec<(String, PriceSeries)>,
}

impl MultiSymbolPriceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the series for `symbol`. Replacing keeps the original position.
    pub fn insert(&mut self, symbol: impl Into<String>, series: PriceSeries) {
        let symbol = symbol.into();
        match self.entries.iter_mut().find(|(s, _)| *s == symbol) {
            Some(slot) => slot.1 = series,
            None => self.entries.push((symbol, series)),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&PriceSeries> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, series)| series)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().map(|(s, _)| s.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PriceSeries)> {
        self.entries.iter().map(|(s, series)| (s.as_str(), series))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for MultiSymbolPriceMap {
    type Item = (String, PriceSeries);
    type IntoIter = std::vec::IntoIter<(String, PriceSeries)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn bar(day: u32, close: f64) -> PriceBar {
        PriceBar {
            symbol: "SPY".into(),
            timestamp: ts(day),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn bar_is_consistent() {
        assert!(bar(2, 100.0).is_consistent());
    }

    #[test]
    fn bar_detects_high_below_close() {
        let mut b = bar(2, 100.0);
        b.high = 99.5;
        assert!(!b.is_consistent());
    }

    #[test]
    fn bar_detects_negative_price() {
        let mut b = bar(2, 100.0);
        b.low = -1.0;
        assert!(!b.is_consistent());
    }

    #[test]
    fn from_bars_sorts_and_dedupes_first_wins() {
        let series = PriceSeries::from_bars(
            "SPY",
            Interval::Daily,
            vec![bar(3, 103.0), bar(2, 102.0), bar(3, 999.0)],
        );
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].timestamp, ts(2));
        assert_eq!(series.bars()[1].close, 103.0);
    }

    #[test]
    fn inconsistent_bars_are_reported_not_fixed() {
        let mut bad = bar(3, 100.0);
        bad.high = 50.0;
        let series = PriceSeries::from_bars("SPY", Interval::Daily, vec![bar(2, 100.0), bad]);
        assert_eq!(series.inconsistent_bars(), vec![1]);
        assert_eq!(series.bars()[1].high, 50.0);
    }

    #[test]
    fn price_map_keeps_insertion_order() {
        let mut map = MultiSymbolPriceMap::new();
        map.insert("MSFT", PriceSeries::from_bars("MSFT", Interval::Daily, vec![]));
        map.insert("AAPL", PriceSeries::from_bars("AAPL", Interval::Daily, vec![]));
        map.insert("MSFT", PriceSeries::from_bars("MSFT", Interval::Daily, vec![bar(2, 1.0)]));
        assert_eq!(map.symbols(), vec!["MSFT", "AAPL"]);
        assert_eq!(map.get("MSFT").unwrap().len(), 1);
    }
}
