//! CSV export of fetched price series.

use anyhow::{Context, Result};
use marketlab_core::domain::{MultiSymbolPriceMap, PriceSeries};
use std::path::{Path, PathBuf};

/// Render a series as CSV in the common column order.
///
/// Columns: timestamp, open, high, low, close, volume, symbol
pub fn series_csv(series: &PriceSeries) -> Result<String> {
    let fmt = if series.interval.is_intraday() {
        "%Y-%m-%d %H:%M:%S"
    } else {
        "%Y-%m-%d"
    };

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "open", "high", "low", "close", "volume", "symbol"])?;
    for bar in series.bars() {
        wtr.write_record([
            &bar.timestamp.format(fmt).to_string(),
            &format!("{:.4}", bar.open),
            &format!("{:.4}", bar.high),
            &format!("{:.4}", bar.low),
            &format!("{:.4}", bar.close),
            &format!("{:.0}", bar.volume),
            &bar.symbol,
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write one `{SYMBOL}_{interval}.csv` per series into `dir`.
pub fn export_prices(prices: &MultiSymbolPriceMap, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export dir {}", dir.display()))?;

    let mut written = Vec::with_capacity(prices.len());
    for (symbol, series) in prices.iter() {
        let path = dir.join(format!("{symbol}_{}.csv", series.interval.as_code()));
        std::fs::write(&path, series_csv(series)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use marketlab_core::domain::{Interval, PriceBar};

    fn series(interval: Interval) -> PriceSeries {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        PriceSeries::from_bars(
            "SPY",
            interval,
            vec![PriceBar {
                symbol: "SPY".into(),
                timestamp: ts,
                open: 472.16,
                high: 473.67,
                low: 470.49,
                close: 472.65,
                volume: 123007793.0,
            }],
        )
    }

    #[test]
    fn csv_has_header_and_rows() {
        let csv = series_csv(&series(Interval::Daily)).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "timestamp,open,high,low,close,volume,symbol");
        assert_eq!(
            lines[1],
            "2024-01-02,472.1600,473.6700,470.4900,472.6500,123007793,SPY"
        );
    }

    #[test]
    fn intraday_keeps_time_of_day() {
        let csv = series_csv(&series(Interval::Minute5)).unwrap();
        assert!(csv.lines().nth(1).unwrap().starts_with("2024-01-02 14:30:00,"));
    }
}
