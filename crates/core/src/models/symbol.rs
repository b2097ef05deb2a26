use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::option::OptionChain;
use super::price::PriceBar;

/// Placeholder stored in any metadata field the upstream source omits.
pub const NO_DATA: &str = "<no data>";

fn no_data() -> String {
    NO_DATA.to_string()
}

/// Descriptive metadata for a ticker symbol.
///
/// Every field falls back to [`NO_DATA`] when a provider doesn't report it,
/// so the filter engine always has a value to group on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMetadata {
    #[serde(default = "no_data")]
    pub asset_type: String,
    #[serde(default = "no_data")]
    pub exchange: String,
    #[serde(default = "no_data")]
    pub sector: String,
    #[serde(default = "no_data")]
    pub industry: String,
    #[serde(default = "no_data")]
    pub country: String,
    #[serde(default = "no_data")]
    pub state: String,
    #[serde(default = "no_data")]
    pub city: String,
    #[serde(default = "no_data")]
    pub short_name: String,
    #[serde(default = "no_data")]
    pub long_name: String,
}

impl Default for SymbolMetadata {
    fn default() -> Self {
        Self {
            asset_type: no_data(),
            exchange: no_data(),
            sector: no_data(),
            industry: no_data(),
            country: no_data(),
            state: no_data(),
            city: no_data(),
            short_name: no_data(),
            long_name: no_data(),
        }
    }
}

impl SymbolMetadata {
    /// Replace empty strings with the sentinel.
    pub fn sanitized(mut self) -> Self {
        for field in self.fields_mut() {
            if field.trim().is_empty() {
                *field = no_data();
            }
        }
        self
    }

    /// Fill every sentinel field in `self` from `other`.
    /// Fields already known are never overwritten.
    pub fn merge(&mut self, other: &SymbolMetadata) {
        let theirs = [
            &other.asset_type,
            &other.exchange,
            &other.sector,
            &other.industry,
            &other.country,
            &other.state,
            &other.city,
            &other.short_name,
            &other.long_name,
        ];
        for (mine, theirs) in self.fields_mut().into_iter().zip(theirs) {
            if mine == NO_DATA && theirs != NO_DATA {
                *mine = theirs.clone();
            }
        }
    }

    /// Number of fields still holding the sentinel.
    #[must_use]
    pub fn missing_fields(&self) -> usize {
        [
            &self.asset_type,
            &self.exchange,
            &self.sector,
            &self.industry,
            &self.country,
            &self.state,
            &self.city,
            &self.short_name,
            &self.long_name,
        ]
        .iter()
        .filter(|f| f.as_str() == NO_DATA)
        .count()
    }

    fn fields_mut(&mut self) -> [&mut String; 9] {
        [
            &mut self.asset_type,
            &mut self.exchange,
            &mut self.sector,
            &mut self.industry,
            &mut self.country,
            &mut self.state,
            &mut self.city,
            &mut self.short_name,
            &mut self.long_name,
        ]
    }
}

/// Everything the session knows about one ticker symbol.
///
/// Created once per symbol on its first successful fetch and never
/// modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolRecord {
    /// Ticker symbol, uppercased (e.g., "AAPL", "BRK-B")
    pub symbol: String,

    /// When the data was retrieved
    pub as_of: DateTime<Utc>,

    pub metadata: SymbolMetadata,

    /// Daily bars, strictly increasing by date with no duplicates
    pub historical_prices: Vec<PriceBar>,

    #[serde(default)]
    pub option_chain: OptionChain,
}

impl SymbolRecord {
    /// Build a record, uppercasing the symbol and sorting/deduplicating
    /// the bars by date (the last bar for a repeated date wins).
    pub fn new(
        symbol: impl Into<String>,
        as_of: DateTime<Utc>,
        metadata: SymbolMetadata,
        mut historical_prices: Vec<PriceBar>,
        option_chain: OptionChain,
    ) -> Self {
        historical_prices.reverse();
        historical_prices.sort_by_key(|b| b.date);
        historical_prices.dedup_by_key(|b| b.date);

        Self {
            symbol: symbol.into().trim().to_uppercase(),
            as_of,
            metadata: metadata.sanitized(),
            historical_prices,
            option_chain,
        }
    }

    /// Retrieval timestamp rendered like `2024-03-05 9:41 AM`.
    #[must_use]
    pub fn as_of_display(&self) -> String {
        let time = self.as_of.format("%I:%M %p").to_string();
        format!(
            "{} {}",
            self.as_of.format("%Y-%m-%d"),
            time.trim_start_matches('0')
        )
    }
}
