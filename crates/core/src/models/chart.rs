use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::CoreError;

use super::price::{PriceField, PriceTable, SeriesPoint};
use super::window::WindowSpec;

/// How the renderer should draw each symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotStyle {
    #[default]
    Line,
    #[serde(alias = "OHLC", alias = "ohlc")]
    Candlestick,
}

impl PlotStyle {
    /// Price field whose first in-window value anchors normalization.
    /// Candles are anchored on the open.
    #[must_use]
    pub fn datum_field(&self, line_field: PriceField) -> PriceField {
        match self {
            PlotStyle::Line => line_field,
            PlotStyle::Candlestick => PriceField::Open,
        }
    }
}

impl std::fmt::Display for PlotStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlotStyle::Line => write!(f, "line"),
            PlotStyle::Candlestick => write!(f, "OHLC"),
        }
    }
}

impl FromStr for PlotStyle {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "line" => Ok(PlotStyle::Line),
            "ohlc" | "candlestick" => Ok(PlotStyle::Candlestick),
            _ => Err(CoreError::InvalidPlotStyle(s.to_string())),
        }
    }
}

/// Everything the caller chooses about a chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub window: WindowSpec,
    pub price_field: PriceField,
    pub plot_style: PlotStyle,
    pub normalize: bool,
    /// Render the y-axis on a log scale. Passed through untouched.
    pub log_y: bool,
}

impl Default for ChartRequest {
    fn default() -> Self {
        Self {
            window: WindowSpec::default(),
            price_field: PriceField::default(),
            plot_style: PlotStyle::default(),
            normalize: false,
            log_y: false,
        }
    }
}

/// A named extra line drawn over the chart (e.g. a weighted portfolio).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

/// Fully prepared chart input: windowed, optionally normalized.
///
/// The renderer draws this as-is without further decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub style: PlotStyle,
    pub price_field: PriceField,
    pub normalized: bool,
    pub log_y: bool,
    /// Resolved window bounds (inclusive)
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub table: PriceTable,
    #[serde(default)]
    pub overlays: Vec<Overlay>,
}

impl ChartData {
    /// The line drawn for `symbol` in the chosen price field.
    #[must_use]
    pub fn line(&self, symbol: &str) -> Option<Vec<SeriesPoint>> {
        self.table.series(symbol, self.price_field)
    }
}
