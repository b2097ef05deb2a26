use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::option::OptionChain;
use crate::models::price::PriceBar;
use crate::models::symbol::SymbolMetadata;

/// Trait abstraction for market data sources.
///
/// Each upstream API implements this trait; the registry decides which
/// provider answers and how their answers are combined.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Descriptive metadata. Fields the source doesn't know are left as the sentinel.
    async fn fetch_metadata(&self, symbol: &str) -> Result<SymbolMetadata, CoreError>;

    /// Daily bars sorted by date, from `since` (or the earliest available) to today.
    async fn fetch_history(
        &self,
        symbol: &str,
        since: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, CoreError>;

    /// Listed options. Providers without option data return an empty chain.
    async fn fetch_option_chain(&self, _symbol: &str) -> Result<OptionChain, CoreError> {
        Ok(OptionChain::default())
    }
}
