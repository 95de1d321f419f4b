//! Extract index constituents from an HTML table.
//!
//! The first `<table>` whose header row names a symbol column and a name
//! column wins. Header text is compared case-insensitively after footnote
//! markers (`[1]`, `[a]`) are removed. Data cells may be `td` or `th`; some
//! pages put the company name in a row header.

use crate::data::DataError;
use crate::domain::{normalize_ticker, SymbolRecord};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Accepted header names for each column. `symbol` and `name` are required.
#[derive(Debug, Clone, Copy)]
pub struct TableSignature {
    pub symbol: &'static [&'static str],
    pub name: &'static [&'static str],
    pub sector: &'static [&'static str],
    pub sub_industry: &'static [&'static str],
    pub exchange: &'static [&'static str],
}

/// Column positions resolved against one header row.
#[derive(Debug, Default)]
struct ColumnMap {
    symbol: usize,
    name: usize,
    sector: Option<usize>,
    sub_industry: Option<usize>,
    exchange: Option<usize>,
}

impl TableSignature {
    fn resolve(&self, headers: &[String]) -> Option<ColumnMap> {
        let find = |accepted: &[&str]| {
            headers
                .iter()
                .position(|h| accepted.iter().any(|a| h.eq_ignore_ascii_case(a)))
        };
        Some(ColumnMap {
            symbol: find(self.symbol)?,
            name: find(self.name)?,
            sector: find(self.sector),
            sub_industry: find(self.sub_industry),
            exchange: find(self.exchange),
        })
    }
}

fn selector(css: &str) -> Result<Selector, DataError> {
    Selector::parse(css).map_err(|e| DataError::SchemaMismatch(format!("selector {css}: {e}")))
}

/// Parse the constituents table out of `html`.
///
/// Rows with an empty or malformed ticker are skipped, and a ticker seen
/// twice keeps its first row. `default_exchange` fills rows without an
/// exchange column.
pub fn parse_symbol_table(
    html: &str,
    signature: &TableSignature,
    default_exchange: Option<&str>,
) -> Result<Vec<SymbolRecord>, DataError> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;

    let mut matched_empty = false;
    for table in document.select(&table_sel) {
        let rows: Vec<ElementRef> = table.select(&row_sel).collect();
        let Some((header_pos, columns)) = rows.iter().enumerate().find_map(|(i, row)| {
            let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
            let all_headers = !cells.is_empty() && cells.iter().all(|c| tag(c) == "th");
            if !all_headers {
                return None;
            }
            let headers: Vec<String> = cells.iter().map(|c| clean_text(c)).collect();
            signature.resolve(&headers).map(|m| (i, m))
        }) else {
            continue;
        };

        let records = extract_rows(&rows[header_pos + 1..], &cell_sel, &columns, default_exchange);
        if !records.is_empty() {
            return Ok(records);
        }
        matched_empty = true;
    }

    Err(DataError::SchemaMismatch(if matched_empty {
        "matching table has no valid rows".to_string()
    } else {
        format!(
            "no table with headers {:?} and {:?}",
            signature.symbol, signature.name
        )
    }))
}

fn extract_rows(
    rows: &[ElementRef],
    cell_sel: &Selector,
    columns: &ColumnMap,
    default_exchange: Option<&str>,
) -> Vec<SymbolRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for row in rows {
        let cells: Vec<ElementRef> = row.select(cell_sel).collect();
        if !cells.iter().any(|c| tag(c) == "td") {
            continue;
        }
        let text = |idx: usize| cells.get(idx).map(|c| clean_text(c)).unwrap_or_default();
        let optional = |idx: Option<usize>| idx.map(text).filter(|t| !t.is_empty());

        let raw = text(columns.symbol);
        let Some(symbol) = normalize_ticker(&raw) else {
            tracing::debug!(raw = %raw, "skipping row with malformed ticker");
            continue;
        };
        if !seen.insert(symbol.clone()) {
            continue;
        }

        records.push(SymbolRecord {
            symbol,
            name: text(columns.name),
            sector: optional(columns.sector),
            sub_industry: optional(columns.sub_industry),
            exchange: optional(columns.exchange).or_else(|| default_exchange.map(str::to_string)),
        });
    }

    records
}

fn tag<'a>(el: &ElementRef<'a>) -> &'a str {
    el.value().name()
}

/// Cell text with footnote markers removed and whitespace collapsed.
fn clean_text(el: &ElementRef) -> String {
    let raw: String = el.text().collect();
    strip_footnotes(&raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_footnotes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}
