use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::CoreError;

use super::chart::PlotStyle;
use super::price::PriceField;
use super::window::Period;

/// Session configuration.
///
/// Every field has a default, so a partial (or empty) JSON document loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Window selected when a chart is first shown.
    pub default_period: Period,

    pub default_price_field: PriceField,

    pub default_plot_style: PlotStyle,

    /// Normalize charts that show more than one symbol.
    pub normalize_multi_symbol: bool,

    /// Earliest date to request history for. `None` fetches everything.
    pub history_start: Option<NaiveDate>,

    /// Optional API keys for providers that require them.
    /// Keys: provider name (e.g., "alphavantage").
    pub api_keys: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_period: Period::OneYear,
            default_price_field: PriceField::AdjClose,
            default_plot_style: PlotStyle::Line,
            normalize_multi_symbol: true,
            history_start: None,
            api_keys: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from JSON. Unknown period, field or style names are rejected.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json)
            .map_err(|e| CoreError::ValidationError(format!("Invalid settings: {e}")))
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize settings: {e}")))
    }
}
