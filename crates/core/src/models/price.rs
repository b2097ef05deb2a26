use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::errors::CoreError;

/// One trading day of price data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    #[serde(default)]
    pub volume: u64,
}

impl PriceBar {
    /// Value of a single price field.
    #[must_use]
    pub fn get(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
            PriceField::AdjClose => self.adj_close,
        }
    }

    /// Divide every price field by `datum`. Volume is untouched.
    #[must_use]
    pub fn scaled(&self, datum: f64) -> Self {
        Self {
            date: self.date,
            open: self.open / datum,
            high: self.high / datum,
            low: self.low / datum,
            close: self.close / datum,
            adj_close: self.adj_close / datum,
            volume: self.volume,
        }
    }
}

/// Which price column a line chart draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    #[default]
    AdjClose,
}

impl PriceField {
    pub const ALL: [PriceField; 5] = [
        PriceField::AdjClose,
        PriceField::Open,
        PriceField::High,
        PriceField::Low,
        PriceField::Close,
    ];
}

impl std::fmt::Display for PriceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceField::Open => write!(f, "open"),
            PriceField::High => write!(f, "high"),
            PriceField::Low => write!(f, "low"),
            PriceField::Close => write!(f, "close"),
            PriceField::AdjClose => write!(f, "adjclose"),
        }
    }
}

impl FromStr for PriceField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(PriceField::Open),
            "high" => Ok(PriceField::High),
            "low" => Ok(PriceField::Low),
            "close" => Ok(PriceField::Close),
            "adjclose" | "adj_close" | "adjusted_close" => Ok(PriceField::AdjClose),
            _ => Err(CoreError::InvalidPriceField(s.to_string())),
        }
    }
}

/// A single (date, value) point of a derived series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Multi-symbol price table keyed by (symbol, date).
///
/// Each symbol's bars are kept sorted by date; symbols iterate alphabetically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    series: BTreeMap<String, Vec<PriceBar>>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a symbol's bars. Bars are sorted by date.
    pub fn insert(&mut self, symbol: &str, mut bars: Vec<PriceBar>) {
        bars.sort_by_key(|b| b.date);
        self.series.insert(symbol.to_uppercase(), bars);
    }

    /// Symbols in the table, alphabetical.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PriceBar])> {
        self.series.iter().map(|(s, b)| (s.as_str(), b.as_slice()))
    }

    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&[PriceBar]> {
        self.series.get(&symbol.to_uppercase()).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.series.contains_key(&symbol.to_uppercase())
    }

    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.series.len()
    }

    /// Total number of (symbol, date) rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Earliest and latest date present across every symbol.
    #[must_use]
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.series.values().filter_map(|b| b.first()).map(|b| b.date).min()?;
        let max = self.series.values().filter_map(|b| b.last()).map(|b| b.date).max()?;
        Some((min, max))
    }

    /// Rows whose date lies in `[from, to]`, for every symbol.
    /// Symbols left without rows are dropped from the result.
    #[must_use]
    pub fn between(&self, from: NaiveDate, to: NaiveDate) -> PriceTable {
        let series = self
            .series
            .iter()
            .filter_map(|(symbol, bars)| {
                // first bar >= from
                let start = bars
                    .binary_search_by_key(&from, |b| b.date)
                    .unwrap_or_else(|pos| pos);
                // first bar > to
                let end = bars
                    .binary_search_by_key(&to, |b| b.date)
                    .map(|pos| pos + 1)
                    .unwrap_or_else(|pos| pos);
                if start >= end {
                    return None;
                }
                Some((symbol.clone(), bars[start..end].to_vec()))
            })
            .collect();
        PriceTable { series }
    }

    /// One price column of one symbol as a series.
    #[must_use]
    pub fn series(&self, symbol: &str, field: PriceField) -> Option<Vec<SeriesPoint>> {
        self.get(symbol).map(|bars| {
            bars.iter()
                .map(|b| SeriesPoint {
                    date: b.date,
                    value: b.get(field),
                })
                .collect()
        })
    }
}
