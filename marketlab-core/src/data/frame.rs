//! DataFrame conversions for cached tables.
//!
//! Price series use the common price schema (`timestamp, open, high, low,
//! close, volume, symbol`). Symbol tables repeat `fetched_at` on every row;
//! the index identity comes from the cache key.

use super::cache::CachedTable;
use super::key::CacheKey;
use super::schema::{validate, PriceSchema, SchemaError, SymbolSchema};
use crate::domain::{MarketIndex, PriceBar, PriceSeries, SymbolRecord, SymbolTable};
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;

fn datetime_column(name: &str, values: Vec<i64>) -> Result<Column, SchemaError> {
    Ok(Column::new(name.into(), values)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?)
}

fn millis_to_naive(ms: i64) -> Result<NaiveDateTime, SchemaError> {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| SchemaError::Invalid(format!("timestamp out of range: {ms}")))
}

fn datetime_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>, SchemaError> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.into_iter().collect())
}

impl PriceSeries {
    /// Render the series in the common price table schema.
    pub fn to_frame(&self) -> Result<DataFrame, SchemaError> {
        let bars = self.bars();
        let timestamps: Vec<i64> = bars
            .iter()
            .map(|b| b.timestamp.and_utc().timestamp_millis())
            .collect();
        let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        let symbols: Vec<&str> = bars.iter().map(|b| b.symbol.as_str()).collect();

        Ok(DataFrame::new(vec![
            datetime_column("timestamp", timestamps)?,
            Column::new("open".into(), opens),
            Column::new("high".into(), highs),
            Column::new("low".into(), lows),
            Column::new("close".into(), closes),
            Column::new("volume".into(), volumes),
            Column::new("symbol".into(), symbols),
        ])?)
    }
}

impl CachedTable for PriceSeries {
    fn to_frame(&self) -> Result<DataFrame, SchemaError> {
        PriceSeries::to_frame(self)
    }

    fn from_frame(df: &DataFrame, key: &CacheKey) -> Result<Self, SchemaError> {
        validate(df, &PriceSchema::schema())?;
        let interval = key
            .interval
            .ok_or_else(|| SchemaError::Invalid("price key without interval".into()))?;

        let timestamps = datetime_values(df, "timestamp")?;
        let open = df.column("open")?.f64()?;
        let high = df.column("high")?.f64()?;
        let low = df.column("low")?.f64()?;
        let close = df.column("close")?.f64()?;
        let volume = df.column("volume")?.f64()?;
        let symbol = df.column("symbol")?.str()?;

        let mut bars = Vec::with_capacity(df.height());
        for (i, ts) in timestamps.into_iter().enumerate() {
            let ts = ts.ok_or_else(|| SchemaError::Invalid(format!("null timestamp at row {i}")))?;
            let value = |ca: &Float64Chunked, name: &str| {
                ca.get(i)
                    .ok_or_else(|| SchemaError::Invalid(format!("null {name} at row {i}")))
            };
            bars.push(PriceBar {
                symbol: symbol.get(i).unwrap_or(key.subject.as_str()).to_string(),
                timestamp: millis_to_naive(ts)?,
                open: value(open, "open")?,
                high: value(high, "high")?,
                low: value(low, "low")?,
                close: value(close, "close")?,
                volume: value(volume, "volume")?,
            });
        }

        Ok(PriceSeries::from_bars(key.subject.clone(), interval, bars))
    }
}

impl CachedTable for SymbolTable {
    fn to_frame(&self) -> Result<DataFrame, SchemaError> {
        let records = self.records();
        let symbols: Vec<&str> = records.iter().map(|r| r.symbol.as_str()).collect();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        let sectors: Vec<Option<&str>> = records.iter().map(|r| r.sector.as_deref()).collect();
        let sub_industries: Vec<Option<&str>> =
            records.iter().map(|r| r.sub_industry.as_deref()).collect();
        let exchanges: Vec<Option<&str>> =
            records.iter().map(|r| r.exchange.as_deref()).collect();
        let fetched_at = self.fetched_at.and_utc().timestamp_millis();

        Ok(DataFrame::new(vec![
            Column::new("symbol".into(), symbols),
            Column::new("name".into(), names),
            Column::new("sector".into(), sectors),
            Column::new("sub_industry".into(), sub_industries),
            Column::new("exchange".into(), exchanges),
            datetime_column("fetched_at", vec![fetched_at; records.len()])?,
        ])?)
    }

    fn from_frame(df: &DataFrame, key: &CacheKey) -> Result<Self, SchemaError> {
        validate(df, &SymbolSchema::schema())?;
        let index: MarketIndex = key
            .subject
            .parse()
            .map_err(|s| SchemaError::Invalid(format!("unknown index '{s}' in cache key")))?;

        let symbol = df.column("symbol")?.str()?;
        let name = df.column("name")?.str()?;
        let sector = df.column("sector")?.str()?;
        let sub_industry = df.column("sub_industry")?.str()?;
        let exchange = df.column("exchange")?.str()?;

        let fetched_at = datetime_values(df, "fetched_at")?
            .into_iter()
            .flatten()
            .next()
            .ok_or_else(|| SchemaError::Invalid("missing fetched_at".into()))?;

        let mut records = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let ticker = symbol
                .get(i)
                .ok_or_else(|| SchemaError::Invalid(format!("null symbol at row {i}")))?;
            records.push(SymbolRecord {
                symbol: ticker.to_string(),
                name: name.get(i).unwrap_or_default().to_string(),
                sector: sector.get(i).map(str::to_string),
                sub_industry: sub_industry.get(i).map(str::to_string),
                exchange: exchange.get(i).map(str::to_string),
            });
        }

        Ok(SymbolTable::new(index, millis_to_naive(fetched_at)?, records))
    }
}
